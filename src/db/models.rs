//! Database models - one struct per stored entity plus its creation payload.
//! Rows are read with `sqlx::query_as`; nested documents live in JSONB columns
//! via `sqlx::types::Json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Portal user. At most one row may carry the `admin` role; that is enforced
/// by the create-admin handler, not by the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A single media entry attached to an attraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: String,
    pub media: Json<Vec<MediaItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub cuisine: String,
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub cuisine: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourPackage {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_days: i32,
    pub attractions: Vec<Uuid>,
    pub restaurants: Vec<Uuid>,
    pub activities: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTourPackage {
    pub name: String,
    pub description: String,
    pub price: Option<i64>,
    pub duration_days: Option<i32>,
    #[serde(default)]
    pub attractions: Vec<Uuid>,
    #[serde(default)]
    pub restaurants: Vec<Uuid>,
    #[serde(default)]
    pub activities: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: Uuid,
    pub title: String,
    pub link: String,
    pub category: String,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNews {
    pub title: String,
    pub link: String,
    pub category: String,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub is_published: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Event category, stored as the Postgres enum `event_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_category", rename_all = "lowercase")]
pub enum EventCategory {
    Festival,
    Culture,
    Sport,
    Culinary,
    Education,
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub organizer: String,
    pub category: EventCategory,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub organizer: String,
    pub category: Option<EventCategory>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub max_participants: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: Uuid,
    pub title: String,
    pub thumbnail: String,
    pub video_url: String,
    pub category: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHighlight {
    pub title: String,
    pub thumbnail: String,
    pub video_url: String,
    pub category: String,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPaper {
    pub id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pdf_file: String,
    pub year: i32,
    pub category: String,
    pub is_active: bool,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResearchPaper {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pdf_file: String,
    pub year: i32,
    pub category: String,
    pub is_active: Option<bool>,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Souvenir {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: i64,
    pub category: String,
    pub is_active: bool,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSouvenir {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: i64,
    pub category: String,
    pub is_active: Option<bool>,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
}

/// One page of a story. Pages are kept unique and ascending by `page_number`
/// on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPage {
    pub page_number: i32,
    pub image: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub cover_image: Option<String>,
    pub pages: Json<Vec<StoryPage>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    pub title: String,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub pages: Vec<StoryPage>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub link: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBanner {
    pub title: String,
    pub image: String,
    pub link: Option<String>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
}

impl Banner {
    /// A banner is shown only while the current time falls inside its
    /// activation window; an absent bound leaves that side open.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.map_or(true, |s| s <= now)
            && self.ends_at.map_or(true, |e| e >= now)
    }
}

/// Contact message workflow state, stored as the Postgres enum `contact_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "contact_status", rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Replied,
    Closed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// What an evaluation points at. Serialized as `targetType` + `targetId`,
/// so each variant carries its own identifier instead of an untyped id next
/// to a string discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetType", content = "targetId", rename_all = "lowercase")]
pub enum EvaluationTarget {
    Attraction(Uuid),
    Restaurant(Uuid),
    Package(Uuid),
    Event(Uuid),
}

impl EvaluationTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationTarget::Attraction(_) => "attraction",
            EvaluationTarget::Restaurant(_) => "restaurant",
            EvaluationTarget::Package(_) => "package",
            EvaluationTarget::Event(_) => "event",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EvaluationTarget::Attraction(id)
            | EvaluationTarget::Restaurant(id)
            | EvaluationTarget::Package(id)
            | EvaluationTarget::Event(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "attraction" => Some(EvaluationTarget::Attraction(id)),
            "restaurant" => Some(EvaluationTarget::Restaurant(id)),
            "package" => Some(EvaluationTarget::Package(id)),
            "event" => Some(EvaluationTarget::Event(id)),
            _ => None,
        }
    }
}

/// Raw evaluation row as stored; `target_type`/`target_id` are folded into
/// an [`EvaluationTarget`] before leaving the API.
#[derive(Debug, Clone, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_type: String,
    pub target_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub target: EvaluationTarget,
    pub rating: i16,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl EvaluationRow {
    /// `None` when the stored discriminator is not a known target kind.
    pub fn into_evaluation(self) -> Option<Evaluation> {
        let target = EvaluationTarget::from_parts(&self.target_type, self.target_id)?;
        Some(Evaluation {
            id: self.id,
            user_id: self.user_id,
            target,
            rating: self.rating,
            comment: self.comment,
            images: self.images,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvaluation {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub target: EvaluationTarget,
    pub rating: i16,
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_target_wire_shape() {
        let id = Uuid::new_v4();
        let target = EvaluationTarget::Restaurant(id);
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["targetType"], "restaurant");
        assert_eq!(json["targetId"], id.to_string());

        let back: EvaluationTarget = serde_json::from_value(json).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_evaluation_target_from_parts_rejects_unknown_kind() {
        let id = Uuid::new_v4();
        assert!(EvaluationTarget::from_parts("hotel", id).is_none());
        assert_eq!(
            EvaluationTarget::from_parts("package", id),
            Some(EvaluationTarget::Package(id))
        );
    }

    #[test]
    fn test_sort_order_serializes_as_order() {
        let banner = Banner {
            id: Uuid::new_v4(),
            title: "t".into(),
            image: "i".into(),
            link: None,
            is_active: true,
            starts_at: None,
            ends_at: None,
            sort_order: 3,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&banner).unwrap();
        assert_eq!(json["order"], 3);
        assert!(json.get("sortOrder").is_none());
    }

    #[test]
    fn test_banner_window_open_ended() {
        let now = Utc::now();
        let mut banner = Banner {
            id: Uuid::new_v4(),
            title: "t".into(),
            image: "i".into(),
            link: None,
            is_active: true,
            starts_at: None,
            ends_at: None,
            sort_order: 0,
            created_at: now,
        };
        assert!(banner.is_visible_at(now));

        banner.starts_at = Some(now + chrono::Duration::hours(1));
        assert!(!banner.is_visible_at(now));

        banner.starts_at = Some(now - chrono::Duration::hours(2));
        banner.ends_at = Some(now - chrono::Duration::hours(1));
        assert!(!banner.is_visible_at(now));

        banner.ends_at = Some(now + chrono::Duration::hours(1));
        assert!(banner.is_visible_at(now));

        banner.is_active = false;
        assert!(!banner.is_visible_at(now));
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            email: "admin@example.com".into(),
            password_hash: "$2b$12$secret".into(),
            role: "admin".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
