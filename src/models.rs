//! Domain records and the language machinery.
//!
//! Every piece of customer-facing text on an excursion exists once per
//! supported language. The supported set is closed: adding a language means
//! touching [`Language`], [`Localized`] and the search index settings
//! together.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Ru,
}

pub const LANGUAGES: [Language; 3] = [Language::En, Language::Es, Language::Ru];
pub const DEFAULT_LANGUAGE: Language = Language::En;

impl Language {
    pub const fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Ru => "ru",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            "ru" => Some(Language::Ru),
            _ => None,
        }
    }
}

/// One value per supported language.
///
/// `get` has no fallback chain: a missing translation reads back as the
/// empty string and callers display whatever is present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    pub en: String,
    pub es: String,
    pub ru: String,
}

impl Localized {
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Es => &self.es,
            Language::Ru => &self.ru,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Faq {
    pub question: Localized,
    pub answer: Localized,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Excursion {
    pub id: u32,
    pub name: Localized,
    pub short_description: Localized,
    pub long_description: Localized,
    pub price: f64,
    pub duration: String,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub capacity: u32,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

/// Admin payload for creating or replacing an excursion. Identity is
/// assigned by the store, never by the caller.
#[derive(Clone, Debug, Deserialize)]
pub struct ExcursionInput {
    pub name: Localized,
    pub short_description: Localized,
    pub long_description: Localized,
    pub price: f64,
    pub duration: String,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub capacity: u32,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

impl ExcursionInput {
    pub fn into_record(self, id: u32) -> Excursion {
        Excursion {
            id,
            name: self.name,
            short_description: self.short_description,
            long_description: self.long_description,
            price: self.price,
            duration: self.duration,
            category: self.category,
            image: self.image,
            gallery: self.gallery,
            featured: self.featured,
            capacity: self.capacity,
            included: self.included,
            excluded: self.excluded,
            faqs: self.faqs,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: Localized,
    pub slug: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CategoryInput {
    pub name: Localized,
    pub slug: String,
}

impl CategoryInput {
    pub fn into_record(self, id: u32) -> Category {
        Category {
            id,
            name: self.name,
            slug: self.slug,
        }
    }
}

/// Reusable included/excluded entries offered in the admin form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredefinedService {
    pub id: u32,
    pub name: Localized,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PredefinedServiceInput {
    pub name: Localized,
}

impl PredefinedServiceInput {
    pub fn into_record(self, id: u32) -> PredefinedService {
        PredefinedService { id, name: self.name }
    }
}

/// Insert-only. Bookings have no lifecycle beyond creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub id: u32,
    pub excursion_id: u32,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub people: u32,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BookingInput {
    pub excursion_id: u32,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub people: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
}
