//! Static SLO reference data: the ten historical periods (tijdvakken) and
//! their characteristic topics (kenmerkende aspecten).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl Period {
    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }
}

/// Legacy `/api/tijdvakken` row: numeric period with its topic ids
#[derive(Debug, Clone, Serialize)]
pub struct LegacyPeriodRow {
    pub tv: String,
    pub label: String,
    pub ka: Vec<String>,
}

impl From<&Period> for LegacyPeriodRow {
    fn from(p: &Period) -> Self {
        Self {
            tv: p.id.trim_start_matches("TV").to_string(),
            label: p.label.clone(),
            ka: p.topics.iter().map(|t| t.id.clone()).collect(),
        }
    }
}

pub fn find_period<'a>(periods: &'a [Period], period_id: &str) -> Option<&'a Period> {
    let wanted = period_id.trim();
    periods.iter().find(|p| {
        p.id.eq_ignore_ascii_case(wanted) || p.id.trim_start_matches("TV") == wanted
    })
}

/// Topic ids are unique across the catalog, so no period is needed.
pub fn find_topic<'a>(periods: &'a [Period], topic_id: &str) -> Option<&'a Topic> {
    let wanted = topic_id.trim();
    periods.iter().find_map(|p| p.topic(wanted))
}

const BUILTIN: &[(&str, &str, &[(&str, &str)])] = &[
    ("TV1", "Tijdvak 1: Jagers en boeren (tot 3000 v.Chr.)", &[
        ("1", "De levenswijze van jagers-verzamelaars"),
        ("2", "Het ontstaan van landbouw en landbouwsamenlevingen"),
        ("3", "De eerste stedelijke gemeenschappen"),
    ]),
    ("TV2", "Tijdvak 2: Grieken en Romeinen (3000 v.Chr.–500)", &[
        ("4", "Wetenschappelijk denken en burgerschap in de Griekse polis"),
        ("5", "Klassieke vormentaal van de Grieks-Romeinse cultuur"),
        ("6", "Groei van het Romeinse imperium"),
        ("7", "Confrontatie Grieks-Romeinse en Germaanse cultuur"),
        ("8", "Ontwikkeling van jodendom en christendom"),
    ]),
    ("TV3", "Tijdvak 3: Monniken en ridders (500–1000)", &[
        ("9", "Verspreiding van het christendom in Europa"),
        ("10", "Ontstaan en verspreiding van de islam"),
        ("11", "Hofstelsel en horigheid"),
        ("12", "Feodale verhoudingen"),
    ]),
    ("TV4", "Tijdvak 4: Steden en staten (1000–1500)", &[
        ("13", "Opkomst handel/ambacht en herleven stedelijke cultuur"),
        ("14", "Opkomst burgerij en zelfstandigheid van steden"),
        ("15", "Primaat wereldlijke of geestelijke macht?"),
        ("16", "Expansie christelijke wereld (kruistochten)"),
        ("17", "Begin staatsvorming en centralisatie"),
    ]),
    ("TV5", "Tijdvak 5: Ontdekkers en hervormers (1500–1600)", &[
        ("18", "Europese overzeese expansie"),
        ("19", "Renaissance: mens- en wereldbeeld"),
        ("20", "Heroriëntatie op de klassieke oudheid"),
        ("21", "Reformatie en kerksplitsing"),
        ("22", "Ontstaan van de Nederlandse staat"),
    ]),
    ("TV6", "Tijdvak 6: Regenten en vorsten (1600–1700)", &[
        ("23", "Absolutisme"),
        ("24", "Bijzondere plaats/bloei van de Republiek"),
        ("25", "Wereldeconomie en handelskapitalisme"),
        ("26", "Wetenschappelijke revolutie"),
    ]),
    ("TV7", "Tijdvak 7: Pruiken en revoluties (1700–1800)", &[
        ("27", "Verlichting"),
        ("28", "Ancien Régime en verlicht absolutisme"),
        ("29", "Democratische revoluties"),
        ("30", "Europees imperialisme, slavernij, abolitionisme"),
    ]),
    ("TV8", "Tijdvak 8: Burgers en stoommachines (1800–1900)", &[
        ("31", "Industriële revolutie"),
        ("32", "Sociale kwestie"),
        ("33", "Voortschrijdende democratisering"),
        ("34", "Emancipatiebewegingen"),
        ("35", "Politiek-maatschappelijke stromingen"),
        ("36", "Modern imperialisme"),
    ]),
    ("TV9", "Tijdvak 9: De wereldoorlogen (1900–1950)", &[
        ("37", "Propaganda/communicatiemiddelen en massaorganisatie"),
        ("38", "Totalitaire ideologieën"),
        ("39", "Crisis wereldkapitalisme"),
        ("40", "Twee wereldoorlogen"),
        ("41", "Racisme en genocide"),
    ]),
    ("TV10", "Tijdvak 10: Televisie en computer (1950–heden)", &[
        ("42", "Koude Oorlog"),
        ("43", "Dekolonisatie"),
        ("44", "Eenwording van Europa"),
        ("45", "Welvaart en sociaal-culturele veranderingen"),
        ("46", "Pluriforme en multiculturele samenlevingen"),
    ]),
];

pub fn builtin_periods() -> Vec<Period> {
    BUILTIN
        .iter()
        .map(|(id, label, topics)| Period {
            id: id.to_string(),
            label: label.to_string(),
            topics: topics
                .iter()
                .map(|(tid, name)| Topic {
                    id: tid.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        })
        .collect()
}
