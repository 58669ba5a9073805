use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rng::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pers,
    Docs,
    Digit,
    Clothes,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pers => "pers",
            Category::Docs => "docs",
            Category::Digit => "digit",
            Category::Clothes => "clothes",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemSpec {
    pub key: String,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub keywords: Vec<String>,
    pub category: Category,
}

impl ItemSpec {
    /// Fraction of `query` found among this item's keywords.
    pub fn keyword_score(&self, query: &[String]) -> f32 {
        keyword_score(&self.keywords, query)
    }
}

pub fn keyword_score(keywords: &[String], query: &[String]) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query.iter().filter(|kw| keywords.contains(kw)).count();
    hits as f32 / query.len() as f32
}

/// Read-only lookup of every item type that can ride the belt. Built once per
/// session and shared with the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    items: BTreeMap<String, ItemSpec>,
}

impl Catalog {
    pub fn new(specs: Vec<ItemSpec>) -> Self {
        Self {
            items: specs
                .into_iter()
                .map(|spec| (spec.key.clone(), spec))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_ITEMS
                .iter()
                .map(|(key, name, (width, height), keywords, category)| ItemSpec {
                    key: key.to_string(),
                    name: name.to_string(),
                    width: *width,
                    height: *height,
                    keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
                    category: *category,
                })
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&ItemSpec> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn random_key(&self, rng: &mut Rng) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let idx = rng.pick_index(self.items.len());
        self.items.keys().nth(idx).cloned()
    }

    /// One keyword or the category of `key`, picked at random.
    pub fn pick_clue(&self, key: &str, rng: &mut Rng) -> String {
        let Some(spec) = self.items.get(key) else {
            return key.to_string();
        };
        let mut candidates: Vec<&str> = spec.keywords.iter().map(String::as_str).collect();
        candidates.push(spec.category.as_str());
        rng.pick(&candidates)
            .map(|clue| clue.to_string())
            .unwrap_or_else(|| spec.category.as_str().to_string())
    }
}

type BuiltinItem = (
    &'static str,
    &'static str,
    (f32, f32),
    &'static [&'static str],
    Category,
);

const BUILTIN_ITEMS: &[BuiltinItem] = &[
    ("boarding_pass", "Boarding Pass", (90.0, 40.0), &["blue", "airport", "travel"], Category::Pers),
    ("book", "Book", (80.0, 110.0), &["blue", "read", "school"], Category::Docs),
    ("business_card", "Business Card", (70.0, 45.0), &["white", "card", "office"], Category::Pers),
    ("concert_ticket", "Concert Ticket", (70.0, 35.0), &["orange", "music", "broadway"], Category::Docs),
    ("credit_card", "Credit Card", (70.0, 45.0), &["bank", "money", "BOA"], Category::Pers),
    ("driver_license", "Driver License", (70.0, 45.0), &["car", "driving", "permit"], Category::Pers),
    ("letter", "Letter", (80.0, 80.0), &["mail", "envelope", "postal"], Category::Docs),
    ("magazine", "Magazine", (135.0, 140.0), &["VOGUE", "yellow", "fashion"], Category::Docs),
    ("movie_ticket", "Movie Ticket", (70.0, 35.0), &["film", "cinema", "Zootopia"], Category::Docs),
    ("newspaper", "Newspaper", (120.0, 95.0), &["news", "Times", "politic"], Category::Docs),
    ("notebook", "Notebook", (75.0, 90.0), &["study", "class", "review"], Category::Docs),
    ("thesis", "Thesis", (75.0, 90.0), &["paper", "SCI", "grad"], Category::Docs),
    ("passport", "Passport", (55.0, 70.0), &["travel", "customs", "visa"], Category::Pers),
    ("stamp", "Stamp", (35.0, 35.0), &["mail", "letter", "purple"], Category::Docs),
    ("student_IDcard", "Student IDcard", (70.0, 45.0), &["ID", "student", "card"], Category::Pers),
    ("camera", "Camera", (90.0, 67.0), &["photo", "Nikon", "lens"], Category::Digit),
    ("gamepad", "Gamepad", (105.0, 65.0), &["game", "play", "steam"], Category::Digit),
    ("hard_disk", "Hard Disk", (90.0, 70.0), &["data", "computer", "store"], Category::Digit),
    ("headset", "Headset", (60.0, 65.0), &["Apple", "white", "ear"], Category::Digit),
    ("headphones", "Headphones", (155.0, 155.0), &["Beats", "blue", "ear"], Category::Digit),
    ("ipad", "Ipad", (75.0, 100.0), &["Apple", "notes", "play"], Category::Digit),
    ("JBL", "JBL", (125.0, 50.0), &["stereo", "music", "blue"], Category::Digit),
    ("keyboard", "Keyboard", (165.0, 100.0), &["typewriter", "Cherry", "comp"], Category::Digit),
    ("mouse", "Mouse", (50.0, 80.0), &["click", "Mickey", "small"], Category::Digit),
    ("phone", "Phone", (50.0, 90.0), &["Apple", "17pro", "tele"], Category::Digit),
    ("power_bank", "Power Bank", (90.0, 70.0), &["travel", "power", "electric"], Category::Digit),
    ("UAV", "UAV", (130.0, 130.0), &["DJI", "drone", "camera"], Category::Digit),
    ("USB", "USB", (40.0, 25.0), &["data", "store", "small"], Category::Digit),
    ("trousers", "Trousers", (125.0, 140.0), &["khaki", "uniform", "style"], Category::Clothes),
    ("woollen_gloves", "Woollen Gloves", (115.0, 80.0), &["wool", "warm", "winter"], Category::Clothes),
    ("overalls", "Overalls", (125.0, 125.0), &["denim", "blue", "style"], Category::Clothes),
    ("white_sweater", "White Sweater", (125.0, 125.0), &["wool", "winter", "white"], Category::Clothes),
    ("scarf", "Scarf", (115.0, 80.0), &["wool", "warm", "neck"], Category::Clothes),
    ("hat", "Hat", (150.0, 150.0), &["summer", "head", "sunshine"], Category::Clothes),
];
