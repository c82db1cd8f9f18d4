use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;

/// A career cluster as stored on `CareerPathway` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster {
    pub id: &'static str,
    pub name: &'static str,
    pub topic: u32,
}

const fn cluster(id: &'static str, name: &'static str, topic: u32) -> Cluster {
    Cluster { id, name, topic }
}

/// Program titles, as they appear in the source file, mapped to clusters.
static CLUSTERS: LazyLock<AHashMap<&'static str, Cluster>> = LazyLock::new(|| {
    let afnr = cluster("AFNR", "Agriculture, Food, and Natural Resources", 2);
    let edu = cluster("EDU", "Education", 7);
    AHashMap::from_iter([
        ("Advanced Manufacturing", cluster("ADV_MFG", "Advanced Manufacturing", 1)),
        ("Agriculture Food and Natural Resources", afnr),
        ("Agriculture Food and Natural Resources Offered At 7 UH Community College Campuses", afnr),
        ("Architectural Engineering", cluster("ARCH_ENG", "Architectural Design and Engineering Technology", 3)),
        ("Building and Construction", cluster("BUILD_CONST", "Building and Construction", 4)),
        ("Business Management, Finance, and Marketing", cluster("BUS_FIN_MKT", "Business Management, Finance, and Marketing", 5)),
        ("Culture Arts", cluster("CULT_ARTS", "Cultural Arts, Media, and Entertainment", 6)),
        ("Education Support", edu),
        ("Education Teaching", edu),
        ("Energy", cluster("ENERGY", "Energy", 8)),
        ("Health Services", cluster("HEALTH", "Health Services", 9)),
        ("Hospitality Tourism", cluster("HOSP_TOUR", "Hospitality, Tourism, and Recreation", 10)),
        ("Information Technology", cluster("IT", "Information Technology and Digital Transformation", 11)),
        ("Law and Public Safety", cluster("LAW_SAFETY", "Law and Public Safety", 12)),
        ("Transportation Services", cluster("TRANSPORT", "Transportation Services", 13)),
    ])
});

/// Program keys mapped to the suffix of their `ProgramOfStudy` id.
static PROGRAM_SUFFIXES: LazyLock<AHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    AHashMap::from_iter([
        ("Ag Food Production Business (AFP)", "AFP"),
        ("Alternative Fuels Technology (AFT)", "AFT"),
        ("Animal Systems (ANS)", "ANS"),
        ("Architectural Design (AD)", "AD"),
        ("Artificial Intelligence (AI)", "AI"),
        ("Automation and Robotics Technology (ART)", "ART"),
        ("Automotive Collision Repair (ACR)", "ACR"),
        ("Automotive Maintenance and Light Repair (MLR)", "MLR"),
        ("Aviation Maintenance Technology (AMT)", "AMT"),
        ("Business Management (BUS MGMT)", "BUS_MGMT"),
        ("Culinary Arts (CA)", "CA"),
        ("Cybersecurity (Cyber)", "CYBER"),
        ("Diagnostic Services (DS)", "DS"),
        ("Digital Design (DD)", "DD"),
        ("Electro-Mechanical Technology (EMT)", "EMT"),
        ("Elementary School (K-6th Grade)", "ELEMENTARY"),
        ("Emergency Medical Services (EMS/EMT)", "EMS_EMT"),
        ("Engineering Technology (ENG TECH)", "ENG_TECH"),
        ("Entrepreneurship (ENTRE)", "ENTRE"),
        ("Fashion and Artisan Design (FAD)", "FAD"),
        ("Film and Media Production (FMP)", "FMP"),
        ("Financial Management (FIN MGMT)", "FIN_MGMT"),
        ("Fire and Emergency Services (FES)", "FES"),
        ("Food Systems (FS)", "FS"),
        ("Human Performance Therapeutic Services (HPTS)", "HPTS"),
        ("Law Enforcement Services (LES)", "LES"),
        ("Marine Maintenance Technology (MMT)", "MMT"),
        ("Marketing Management (MRKT MGMT)", "MRKT_MGMT"),
        ("Mechanical, Electrical, and Plumbing (MEP) Systems", "MEP"),
        ("Middle/High School (6th-12th Grade)", "MIDDLE_HIGH"),
        ("Natural Resources Management (NRM)", "NRM"),
        ("Networking", "NETWORKING"),
        ("Nursing Services (NS)", "NS"),
        ("Power Grid Technology (PGT)", "PGT"),
        ("Pre-Law", "PRE_LAW"),
        ("Preschool/Early Childhood (birth-3rd. Grade)", "PRESCHOOL"),
        ("Programming", "PROGRAMMING"),
        ("Public Health Services (PHS)", "PHS"),
        ("Residential and Commercial Construction", "RES_COMM_CONST"),
        ("School Counselor (HSTB Licensed)", "SCHOOL_COUNSELOR"),
        ("School Psychologist", "SCHOOL_PSYCHOLOGIST"),
        ("School Social Worker", "SCHOOL_SOCIAL_WORKER"),
        ("Supply Chain and Logistics Technology (SCLT)", "SCLT"),
        ("Sustainable Energies Technology (SET)", "SET"),
        ("Sustainable Hospitality and Tourism Management (SHTM)", "SHTM"),
        ("Web Design and Development (WDD)", "WDD"),
        ("Welding", "WELDING"),
    ])
});

/// Titles that mark placeholder entries rather than a cluster.
const PLACEHOLDER_TITLES: [&str; 2] = ["OVERRIDE", "pathway match title on button"];

pub fn cluster_for_title(title: &str) -> Option<Cluster> {
    if PLACEHOLDER_TITLES.contains(&title) {
        return None;
    }
    CLUSTERS.get(title).copied()
}

pub fn program_suffix(key: &str) -> Option<&'static str> {
    PROGRAM_SUFFIXES.get(key).copied()
}

/// Stage name for a pathway level: 1 entry, 2 community college, 3 university.
pub fn stage(level: i64) -> Option<&'static str> {
    match level {
        1 => Some("entry"),
        2 => Some("cc"),
        3 => Some("university"),
        _ => None,
    }
}

static NON_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").ok());

/// Id for a free-text label: okina and quotes dropped, other runs of
/// non-alphanumerics collapsed to `_`, at most 80 characters.
pub fn slugify(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !matches!(c, 'ʻ' | '\'' | '\u{2018}' | '\u{2019}')).collect();
    let joined = match NON_WORD.as_ref() {
        Some(re) => re.replace_all(&stripped, "_").into_owned(),
        None => stripped,
    };
    let mut slug = joined.trim_matches('_').to_string();
    slug.truncate(80);
    slug
}
