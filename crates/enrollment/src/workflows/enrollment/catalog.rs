//! Closed answer sets the enrollment form accepts, plus the department's municipality catalog.

pub const TIPOS_DOCUMENTO: [&str; 2] = ["cedula", "cedula_extranjeria"];
pub const SEXOS: [&str; 3] = ["masculino", "femenino", "otro"];
pub const ESTADOS_CIVILES: [&str; 6] = [
    "soltero",
    "casado",
    "union_libre",
    "separado",
    "divorciado",
    "viudo",
];
pub const SECTORES: [&str; 3] = ["agroindustria", "industria_comercio", "turismo_servicios"];
pub const TIPOS_PERSONA: [&str; 2] = ["natural", "juridica"];

/// A municipality and the number of program places reserved for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Municipality {
    pub name: &'static str,
    pub subregion: &'static str,
    pub quota: u32,
}

const fn m(subregion: &'static str, name: &'static str, quota: u32) -> Municipality {
    Municipality {
        name,
        subregion,
        quota,
    }
}

pub const MUNICIPALITIES: &[Municipality] = &[
    m("Abades", "Providencia", 3),
    m("Abades", "Samaniego", 12),
    m("Abades", "Santacruz", 5),
    m("Centro", "Chachagüí", 7),
    m("Centro", "La Florida", 4),
    m("Centro", "Nariño", 3),
    m("Centro", "Pasto", 175),
    m("Centro", "Tangua", 6),
    m("Centro", "Yacuanquer", 5),
    m("Cordillera", "Cumbitara", 4),
    m("Cordillera", "El Rosario", 5),
    m("Cordillera", "Leiva", 4),
    m("Cordillera", "Policarpa", 4),
    m("Cordillera", "Taminango", 8),
    m("Exprovincia de Obando", "Aldana", 3),
    m("Exprovincia de Obando", "Contadero", 3),
    m("Exprovincia de Obando", "Córdoba", 7),
    m("Exprovincia de Obando", "Cuaspud", 4),
    m("Exprovincia de Obando", "Cumbal", 17),
    m("Exprovincia de Obando", "Funes", 3),
    m("Exprovincia de Obando", "Guachucal", 9),
    m("Exprovincia de Obando", "Gualmatán", 3),
    m("Exprovincia de Obando", "Iles", 3),
    m("Exprovincia de Obando", "Ipiales", 52),
    m("Exprovincia de Obando", "Potosí", 4),
    m("Exprovincia de Obando", "Puerres", 4),
    m("Exprovincia de Obando", "Pupiales", 8),
    m("Guambuyaco", "El Peñol", 4),
    m("Guambuyaco", "El Tambo", 6),
    m("Guambuyaco", "La Llanada", 3),
    m("Guambuyaco", "Los Andes", 4),
    m("Juanambú", "Arboleda", 4),
    m("Juanambú", "Buesaco", 11),
    m("Juanambú", "La Unión", 14),
    m("Juanambú", "San Lorenzo", 8),
    m("Juanambú", "San Pedro de Cartago", 3),
    m("Occidente", "Ancuya", 4),
    m("Occidente", "Consacá", 6),
    m("Occidente", "Linares", 4),
    m("Occidente", "Sandoná", 9),
    m("Pacífico Sur", "Francisco Pizarro", 6),
    m("Pacífico Sur", "San Andrés de Tumaco", 115),
    m("Pie de Monte Costero", "Mallama", 4),
    m("Pie de Monte Costero", "Ricaurte", 9),
    m("Río Mayo", "Albán", 4),
    m("Río Mayo", "Belén", 3),
    m("Río Mayo", "Colón", 4),
    m("Río Mayo", "El Tablón de Gómez", 6),
    m("Río Mayo", "La Cruz", 8),
    m("Río Mayo", "San Bernardo", 4),
    m("Río Mayo", "San Pablo", 7),
    m("Sabana", "Guaitarilla", 6),
    m("Sabana", "Imués", 4),
    m("Sabana", "Ospina", 4),
    m("Sabana", "Sapuyes", 6),
    m("Sabana", "Túquerres", 15),
    m("Sanquianga", "El Charco", 10),
    m("Sanquianga", "La Tola", 3),
    m("Sanquianga", "Mosquera", 6),
    m("Sanquianga", "Olaya Herrera", 11),
    m("Sanquianga", "Santa Bárbara", 6),
    m("Telembí", "Barbacoas", 25),
    m("Telembí", "Magüí", 11),
    m("Telembí", "Roberto Payán", 6),
];

/// Exact-name lookup; names are matched as written, accents included.
pub fn find_municipality(name: &str) -> Option<&'static Municipality> {
    let name = name.trim();
    MUNICIPALITIES.iter().find(|entry| entry.name == name)
}

/// Subregions in catalog order, each listed once.
pub fn subregions() -> Vec<&'static str> {
    let mut ordered: Vec<&'static str> = Vec::new();
    for entry in MUNICIPALITIES {
        if !ordered.contains(&entry.subregion) {
            ordered.push(entry.subregion);
        }
    }
    ordered
}

pub fn municipalities_in(subregion: &str) -> impl Iterator<Item = &'static Municipality> + '_ {
    MUNICIPALITIES
        .iter()
        .filter(move |entry| entry.subregion == subregion)
}
