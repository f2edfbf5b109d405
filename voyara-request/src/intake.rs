use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use voyara_core::repository::EntityDirectory;
use voyara_core::{
    CoreError, CoreResult, DateRange, ProviderType, RequestMetadata, ServiceEntity,
    ValidationErrors,
};
use voyara_shared::MaskedEmail;

pub const MAX_REQUESTED_QUANTITY: i64 = 500;
pub const MAX_GUEST_COUNT: i64 = 1000;
pub const MAX_SPECIAL_REQUIREMENTS: usize = 1000;

/// Raw create payload. Fields stay untyped JSON so that wrong types land in
/// the error bag instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceRequestInput {
    pub provider_type: Option<Value>,
    pub entity_id: Option<Value>,
    pub package_id: Option<Value>,
    pub start_date: Option<Value>,
    pub end_date: Option<Value>,
    pub requested_quantity: Option<Value>,
    pub guest_count: Option<Value>,
    pub special_requirements: Option<Value>,
    pub contact_email: Option<Value>,
}

/// A validated request with its service entity resolved.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub agent_id: Uuid,
    pub entity: ServiceEntity,
    pub package_id: Option<Uuid>,
    pub range: DateRange,
    /// `None` means the quantity resolver decides.
    pub requested_quantity: Option<u32>,
    pub metadata: RequestMetadata,
}

pub struct RequestIntake {
    entities: Arc<dyn EntityDirectory>,
}

impl RequestIntake {
    pub fn new(entities: Arc<dyn EntityDirectory>) -> Self {
        Self { entities }
    }

    pub async fn normalize(
        &self,
        agent_id: Uuid,
        input: ServiceRequestInput,
        today: NaiveDate,
    ) -> CoreResult<NormalizedRequest> {
        let mut errors = ValidationErrors::new();

        let provider_type = if is_present(input.provider_type.as_ref()) {
            text(&mut errors, "provider_type", "provider type", input.provider_type.as_ref()).and_then(|raw| {
                match raw.parse::<ProviderType>() {
                    Ok(provider_type) => Some(provider_type),
                    Err(_) => {
                        errors.add("provider_type", "The selected provider type is invalid.");
                        None
                    }
                }
            })
        } else {
            errors.add("provider_type", "The provider type field is required.");
            None
        };

        let entity_id = required_uuid(&mut errors, "entity_id", "entity id", input.entity_id.as_ref());
        let package_id = match text(&mut errors, "package_id", "package id", input.package_id.as_ref()) {
            None => None,
            Some(raw) => parse_uuid(&mut errors, "package_id", "package id", raw),
        };

        let start = required_date(&mut errors, "start_date", "start date", input.start_date.as_ref());
        let end = required_date(&mut errors, "end_date", "end date", input.end_date.as_ref());

        if let Some(start) = start {
            if start < today {
                errors.add("start_date", "The start date must be a date after or equal to today.");
            }
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors.add("end_date", "The end date must be a date after or equal to start date.");
            } else if end == start && provider_type == Some(ProviderType::Hotel) {
                errors.add("end_date", "The end date must be a date after start date.");
            }
        }

        let requested_quantity = bounded(
            &mut errors,
            "requested_quantity",
            "requested quantity",
            input.requested_quantity.as_ref(),
            MAX_REQUESTED_QUANTITY,
        );
        let guest_count = bounded(
            &mut errors,
            "guest_count",
            "guest count",
            input.guest_count.as_ref(),
            MAX_GUEST_COUNT,
        );
        if !is_present(input.requested_quantity.as_ref()) && !is_present(input.guest_count.as_ref()) {
            errors.add(
                "guest_count",
                "The guest count field is required when requested quantity is not present.",
            );
        }

        let special_requirements = text(
            &mut errors,
            "special_requirements",
            "special requirements",
            input.special_requirements.as_ref(),
        )
        .map(str::to_string);
        if special_requirements
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_SPECIAL_REQUIREMENTS)
        {
            errors.add(
                "special_requirements",
                format!("The special requirements may not be greater than {} characters.", MAX_SPECIAL_REQUIREMENTS),
            );
        }

        let contact_email =
            text(&mut errors, "contact_email", "contact email", input.contact_email.as_ref()).map(str::to_string);
        if contact_email.as_deref().is_some_and(|email| !looks_like_email(email)) {
            errors.add("contact_email", "The contact email must be a valid email address.");
        }

        // Only look the entity up once its type and id are usable.
        let entity = match (provider_type, entity_id) {
            (Some(provider_type), Some(entity_id)) => {
                let found = self.entities.find_entity(provider_type, entity_id).await?;
                if found.is_none() {
                    errors.add("entity_id", "The selected entity id is invalid.");
                }
                found
            }
            _ => None,
        };

        errors.into_result()?;

        let (Some(entity), Some(start), Some(end)) = (entity, start, end) else {
            return Err(CoreError::Validation(ValidationErrors::single(
                "entity_id",
                "The selected entity id is invalid.",
            )));
        };

        Ok(NormalizedRequest {
            agent_id,
            entity,
            package_id,
            range: DateRange::new(start, end),
            requested_quantity,
            metadata: RequestMetadata {
                guest_count,
                special_requirements,
                contact_email: contact_email.map(MaskedEmail::new),
            },
        })
    }
}

/// Payload of a room-allocation quote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomQuoteInput {
    pub guest_count: Option<Value>,
    pub start_date: Option<Value>,
    pub end_date: Option<Value>,
}

impl RoomQuoteInput {
    pub fn validate(&self) -> CoreResult<(u32, DateRange)> {
        let mut errors = ValidationErrors::new();

        let guests = bounded(
            &mut errors,
            "guest_count",
            "guest count",
            self.guest_count.as_ref(),
            MAX_GUEST_COUNT,
        );
        if !is_present(self.guest_count.as_ref()) {
            errors.add("guest_count", "The guest count field is required.");
        }
        let start = required_date(&mut errors, "start_date", "start date", self.start_date.as_ref());
        let end = required_date(&mut errors, "end_date", "end date", self.end_date.as_ref());
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                errors.add("end_date", "The end date must be a date after start date.");
            }
        }

        errors.into_result()?;
        match (guests, start, end) {
            (Some(guests), Some(start), Some(end)) => Ok((guests, DateRange::new(start, end))),
            _ => Err(ValidationErrors::single("guest_count", "The guest count field is required.").into()),
        }
    }
}

/// Null and blank strings count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Trimmed text of a string field. Other JSON types are reported in the bag.
fn text<'a>(errors: &mut ValidationErrors, field: &str, label: &str, value: Option<&'a Value>) -> Option<&'a str> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
        _ => {
            errors.add(field, format!("The {} must be a string.", label));
            None
        }
    }
}

fn parse_uuid(errors: &mut ValidationErrors, field: &str, label: &str, raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, format!("The {} must be a valid UUID.", label));
            None
        }
    }
}

fn required_uuid(errors: &mut ValidationErrors, field: &str, label: &str, value: Option<&Value>) -> Option<Uuid> {
    if !is_present(value) {
        errors.add(field, format!("The {} field is required.", label));
        return None;
    }
    let raw = text(errors, field, label, value)?;
    parse_uuid(errors, field, label, raw)
}

fn required_date(errors: &mut ValidationErrors, field: &str, label: &str, value: Option<&Value>) -> Option<NaiveDate> {
    if !is_present(value) {
        errors.add(field, format!("The {} field is required.", label));
        return None;
    }
    let Some(raw) = value.and_then(Value::as_str).map(str::trim) else {
        errors.add(field, format!("The {} is not a valid date.", label));
        return None;
    };
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, format!("The {} is not a valid date.", label));
            None
        }
    }
}

/// Whole numbers, given as JSON numbers or numeric strings.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bounded(errors: &mut ValidationErrors, field: &str, label: &str, value: Option<&Value>, max: i64) -> Option<u32> {
    if !is_present(value) {
        return None;
    }
    let Some(value) = value.and_then(integer) else {
        errors.add(field, format!("The {} must be an integer.", label));
        return None;
    };
    if value < 1 {
        errors.add(field, format!("The {} must be at least 1.", label));
        None
    } else if value > max {
        errors.add(field, format!("The {} may not be greater than {}.", label, max));
        None
    } else {
        u32::try_from(value).ok()
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voyara_store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    async fn intake_with_hotel() -> (RequestIntake, ServiceEntity) {
        let store = Arc::new(MemoryStore::new());
        let hotel = ServiceEntity {
            id: Uuid::new_v4(),
            provider_type: ProviderType::Hotel,
            provider_id: Uuid::new_v4(),
            name: "Harbour View".to_string(),
        };
        store.add_entity(hotel.clone()).await;
        (RequestIntake::new(store), hotel)
    }

    fn hotel_input(hotel: &ServiceEntity) -> ServiceRequestInput {
        ServiceRequestInput {
            provider_type: Some(json!("hotel")),
            entity_id: Some(json!(hotel.id)),
            start_date: Some(json!("2026-11-01")),
            end_date: Some(json!("2026-11-04")),
            guest_count: Some(json!(10)),
            special_requirements: Some(json!("  sea view  ")),
            contact_email: Some(json!("agent@example.com")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_normalizes_valid_input() {
        let (intake, hotel) = intake_with_hotel().await;
        let agent = Uuid::new_v4();

        let normalized = intake.normalize(agent, hotel_input(&hotel), today()).await.unwrap();
        assert_eq!(normalized.entity, hotel);
        assert_eq!(normalized.range.nights(), 3);
        assert_eq!(normalized.requested_quantity, None);
        assert_eq!(normalized.metadata.guest_count, Some(10));
        assert_eq!(normalized.metadata.special_requirements.as_deref(), Some("sea view"));
        assert_eq!(
            normalized.metadata.contact_email.as_ref().map(MaskedEmail::expose),
            Some("agent@example.com")
        );
    }

    #[tokio::test]
    async fn test_collects_every_field_error() {
        let (intake, _) = intake_with_hotel().await;
        let input = ServiceRequestInput {
            provider_type: Some(json!("cruise")),
            entity_id: Some(json!("not-a-uuid")),
            start_date: Some(json!("2026-02-30")),
            requested_quantity: Some(json!(0)),
            contact_email: Some(json!("nobody")),
            ..Default::default()
        };

        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), input, today()).await else {
            panic!("expected validation errors");
        };
        for field in ["provider_type", "entity_id", "start_date", "end_date", "requested_quantity", "contact_email"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
    }

    #[tokio::test]
    async fn test_rejects_unknown_entity_and_bad_dates() {
        let (intake, hotel) = intake_with_hotel().await;

        let mut unknown = hotel_input(&hotel);
        unknown.entity_id = Some(json!(Uuid::new_v4()));
        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), unknown, today()).await else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("entity_id").unwrap()[0], "The selected entity id is invalid.");

        // Entity exists but under another provider type
        let mut wrong_type = hotel_input(&hotel);
        wrong_type.provider_type = Some(json!("flight"));
        assert!(intake.normalize(Uuid::new_v4(), wrong_type, today()).await.is_err());

        let mut past = hotel_input(&hotel);
        past.start_date = Some(json!("2026-01-01"));
        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), past, today()).await else {
            panic!("expected validation errors");
        };
        assert!(errors.has("start_date"));

        let mut zero_nights = hotel_input(&hotel);
        zero_nights.end_date = Some(json!("2026-11-01"));
        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), zero_nights, today()).await else {
            panic!("expected validation errors");
        };
        assert!(errors.has("end_date"));
    }

    #[tokio::test]
    async fn test_requires_quantity_or_guests() {
        let (intake, hotel) = intake_with_hotel().await;
        let mut input = hotel_input(&hotel);
        input.guest_count = None;

        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), input.clone(), today()).await else {
            panic!("expected validation errors");
        };
        assert!(errors.has("guest_count"));

        input.requested_quantity = Some(json!(2));
        let normalized = intake.normalize(Uuid::new_v4(), input, today()).await.unwrap();
        assert_eq!(normalized.requested_quantity, Some(2));
    }

    #[tokio::test]
    async fn test_wrong_types_land_in_the_bag() {
        let (intake, hotel) = intake_with_hotel().await;

        // Numeric strings pass as integers
        let mut numeric = hotel_input(&hotel);
        numeric.guest_count = Some(json!(" 4 "));
        let normalized = intake.normalize(Uuid::new_v4(), numeric, today()).await.unwrap();
        assert_eq!(normalized.metadata.guest_count, Some(4));

        let mut wrong = hotel_input(&hotel);
        wrong.guest_count = Some(json!("abc"));
        wrong.requested_quantity = Some(json!(2.5));
        wrong.provider_type = Some(json!(7));
        wrong.start_date = Some(json!(20261101));
        let Err(CoreError::Validation(errors)) = intake.normalize(Uuid::new_v4(), wrong, today()).await else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("guest_count").unwrap()[0], "The guest count must be an integer.");
        assert_eq!(errors.get("requested_quantity").unwrap()[0], "The requested quantity must be an integer.");
        assert_eq!(errors.get("provider_type").unwrap()[0], "The provider type must be a string.");
        assert!(errors.has("start_date"));
    }

    #[test]
    fn test_room_quote_input() {
        let input = RoomQuoteInput {
            guest_count: Some(json!(7)),
            start_date: Some(json!("2026-11-01")),
            end_date: Some(json!("2026-11-03")),
        };
        let (guests, range) = input.validate().unwrap();
        assert_eq!(guests, 7);
        assert_eq!(range.nights(), 2);

        let bad = RoomQuoteInput {
            guest_count: Some(json!(0)),
            start_date: Some(json!("2026-11-03")),
            end_date: Some(json!("2026-11-03")),
        };
        let Err(CoreError::Validation(errors)) = bad.validate() else {
            panic!("expected validation errors");
        };
        assert!(errors.has("guest_count"));
        assert!(errors.has("end_date"));
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.de"));
        assert!(!looks_like_email("a@@c.de"));
    }
}
