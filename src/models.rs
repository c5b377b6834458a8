//! Domain model for Flickr photos and photosets
//!
//! Raw API records arrive as loosely-typed JSON trees; the factory
//! functions here validate them into immutable value types. Validation is
//! presence-only: a record missing a required key is rejected (the factory
//! returns `None`), while present-but-malformed values propagate into the
//! derived computations. Source keys that are not promoted to a typed
//! field remain reachable through the `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// URL scheme
// ============================================================================

/// Scheme used when deriving media and web URLs
///
/// Flickr serves both; which one to emit depends on the protocol of the
/// embedding request, which the caller supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UrlScheme {
    /// Plain HTTP
    Http,
    /// HTTPS
    #[default]
    Https,
}

impl UrlScheme {
    /// Scheme name without the `://` separator
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlScheme::Http => "http",
            UrlScheme::Https => "https",
        }
    }
}

impl fmt::Display for UrlScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Size codes
// ============================================================================

/// The 11 fixed image renditions Flickr serves per photo
///
/// Each variant maps to the single-character suffix of the static image
/// URL (e.g. `s` for the 75x75 square).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeCode {
    /// 75x75 square (`s`)
    SmallSquare,
    /// 150x150 square (`q`)
    LargeSquare,
    /// 100 on the longest side (`t`)
    Thumbnail,
    /// 240 on the longest side (`m`)
    Small240,
    /// 320 on the longest side (`n`)
    Small320,
    /// 640 on the longest side (`z`)
    Medium640,
    /// 800 on the longest side (`c`)
    Medium800,
    /// 1024 on the longest side (`b`)
    Large1024,
    /// 1600 on the longest side (`h`)
    Large1600,
    /// 2048 on the longest side (`k`)
    Large2048,
    /// Original upload (`o`)
    Original,
}

impl SizeCode {
    /// Every size code, smallest rendition first
    pub const ALL: [SizeCode; 11] = [
        SizeCode::SmallSquare,
        SizeCode::LargeSquare,
        SizeCode::Thumbnail,
        SizeCode::Small240,
        SizeCode::Small320,
        SizeCode::Medium640,
        SizeCode::Medium800,
        SizeCode::Large1024,
        SizeCode::Large1600,
        SizeCode::Large2048,
        SizeCode::Original,
    ];

    /// Single-character upstream identifier for this rendition
    pub fn as_char(&self) -> char {
        match self {
            SizeCode::SmallSquare => 's',
            SizeCode::LargeSquare => 'q',
            SizeCode::Thumbnail => 't',
            SizeCode::Small240 => 'm',
            SizeCode::Small320 => 'n',
            SizeCode::Medium640 => 'z',
            SizeCode::Medium800 => 'c',
            SizeCode::Large1024 => 'b',
            SizeCode::Large1600 => 'h',
            SizeCode::Large2048 => 'k',
            SizeCode::Original => 'o',
        }
    }
}

// ============================================================================
// Photo
// ============================================================================

/// One photo record retrieved from the Flickr API
///
/// Ids are kept as opaque strings: upstream ids are numeric but some
/// exceed integer precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Opaque upstream identifier
    pub id: String,
    /// Farm number used in static image URLs
    pub farm_id: u64,
    /// Server number used in static image URLs
    pub server_id: u64,
    /// Token signing the static image URLs
    pub secret: String,
    /// Display title, may be empty
    pub title: String,
    /// Display description, may be empty
    pub description: String,
    /// Source keys not promoted to a typed field
    pub extra: Map<String, Value>,
}

impl Photo {
    /// Build a photo from a raw API record
    ///
    /// Returns `None` unless `id`, `farm`, `server` and `secret` are all
    /// present. `title` and `description` default to empty strings.
    pub fn from_record(record: &Value) -> Option<Photo> {
        let obj = record.as_object()?;

        if !(obj.contains_key("id")
            && obj.contains_key("farm")
            && obj.contains_key("server")
            && obj.contains_key("secret"))
        {
            return None;
        }

        Some(Photo {
            id: text_field(obj.get("id")),
            farm_id: numeric_field(obj.get("farm")),
            server_id: numeric_field(obj.get("server")),
            secret: text_field(obj.get("secret")),
            title: text_field(obj.get("title")),
            description: content_field(obj.get("description")),
            extra: extra_fields(
                obj,
                &["id", "farm", "server", "secret", "title", "description"],
            ),
        })
    }

    /// Static image URL for the given rendition, HTTPS scheme
    pub fn url(&self, size: SizeCode) -> String {
        self.url_with_scheme(size, UrlScheme::default())
    }

    /// Static image URL for the given rendition and scheme
    pub fn url_with_scheme(&self, size: SizeCode, scheme: UrlScheme) -> String {
        format!(
            "{}://farm{}.staticflickr.com/{}/{}_{}_{}.jpg",
            scheme,
            self.farm_id,
            self.server_id,
            self.id,
            self.secret,
            size.as_char()
        )
    }

    /// Look up an unpromoted source field (e.g. `originalformat`)
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

// ============================================================================
// Photoset
// ============================================================================

/// One photoset (album) record retrieved from the Flickr API
///
/// A photoset does not embed its photos; they resolve through a further
/// service call keyed by the photoset id (see [`Photoset::photos`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photoset {
    /// Opaque upstream identifier
    pub id: String,
    /// Display title, never empty
    pub title: String,
    /// Owner identifier; absent when the set was fetched without a
    /// known owner
    pub user_id: Option<String>,
    /// Source keys not promoted to a typed field
    pub extra: Map<String, Value>,
}

impl Photoset {
    /// Build a photoset from a raw API record
    ///
    /// Returns `None` unless `id` and a non-empty `title` are present.
    /// Titles arrive `_content`-wrapped (`{"title": {"_content": ...}}`).
    pub fn from_record(record: &Value, user_id: Option<&str>) -> Option<Photoset> {
        let obj = record.as_object()?;

        if !obj.contains_key("id") {
            return None;
        }

        let title = content_field(obj.get("title"));
        if title.is_empty() {
            return None;
        }

        Some(Photoset {
            id: text_field(obj.get("id")),
            title,
            user_id: user_id.map(str::to_string),
            extra: extra_fields(obj, &["id", "title"]),
        })
    }

    /// Public web URL of this photoset, HTTPS scheme
    ///
    /// Empty string when the owner is unknown.
    pub fn url(&self) -> String {
        self.url_with_scheme(UrlScheme::default())
    }

    /// Public web URL of this photoset for the given scheme
    pub fn url_with_scheme(&self, scheme: UrlScheme) -> String {
        match &self.user_id {
            Some(user_id) => format!(
                "{}://www.flickr.com/photos/{}/sets/{}",
                scheme, user_id, self.id
            ),
            None => String::new(),
        }
    }

    /// Resolve the photos within this photoset
    ///
    /// Issues a further service call keyed by this photoset's id; the
    /// owner, when known, is passed along to speed up the upstream
    /// lookup.
    pub async fn photos(&self, service: &crate::service::FlickrService) -> Option<Vec<Photo>> {
        service
            .photos_in_photoset(&self.id, self.user_id.as_deref())
            .await
    }

    /// Look up an unpromoted source field (e.g. `date_create`)
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

// ============================================================================
// Field readers
// ============================================================================

/// Read a field as text. Numbers render as strings because Flickr mixes
/// the two freely (server numbers appear as either).
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read a numeric field, accepting numbers and numeric strings. Any other
/// shape degrades to 0: required-field validation is presence-only, so
/// such a record still constructs and later yields a malformed URL.
fn numeric_field(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Read a `{"_content": ...}`-wrapped field, falling back to the plain
/// value when it is not wrapped
fn content_field(value: Option<&Value>) -> String {
    match value {
        Some(v) => match v.get("_content") {
            Some(inner) => text_field(Some(inner)),
            None => text_field(Some(v)),
        },
        None => String::new(),
    }
}

/// Collect every key not in `promoted` into the extras map
fn extra_fields(obj: &Map<String, Value>, promoted: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(key, _)| !promoted.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn photo_record() -> Value {
        json!({
            "id": "21231207825",
            "secret": "a0fb1361eb",
            "server": "756",
            "farm": 1,
            "title": "Carrington Road retaining walls",
            "isprimary": "1",
            "description": { "_content": "" }
        })
    }

    #[test]
    fn test_photo_url_determinism() {
        let photo = Photo::from_record(&photo_record()).unwrap();

        assert_eq!(
            photo.url(SizeCode::SmallSquare),
            "https://farm1.staticflickr.com/756/21231207825_a0fb1361eb_s.jpg"
        );
        assert_eq!(
            photo.url_with_scheme(SizeCode::Original, UrlScheme::Http),
            "http://farm1.staticflickr.com/756/21231207825_a0fb1361eb_o.jpg"
        );
    }

    #[test]
    fn test_photo_requires_all_url_fields() {
        for missing in ["id", "farm", "server", "secret"] {
            let mut record = photo_record();
            record.as_object_mut().unwrap().remove(missing);
            assert!(
                Photo::from_record(&record).is_none(),
                "record missing '{}' should not construct",
                missing
            );
        }
    }

    #[test]
    fn test_photo_description_is_optional() {
        let mut record = photo_record();
        record.as_object_mut().unwrap().remove("description");

        let photo = Photo::from_record(&record).unwrap();
        assert_eq!(photo.description, "");
    }

    #[test]
    fn test_photo_numeric_fields_accept_strings_and_floats() {
        // The API serializes "server" as a string and "farm" as a number
        let photo = Photo::from_record(&photo_record()).unwrap();
        assert_eq!(photo.farm_id, 1);
        assert_eq!(photo.server_id, 756);

        // Some serializations render farm as a float
        let mut record = photo_record();
        record["farm"] = json!(6.0);
        let photo = Photo::from_record(&record).unwrap();
        assert_eq!(photo.farm_id, 6);
    }

    #[test]
    fn test_photo_malformed_farm_degrades_to_zero() {
        // Present-but-malformed values still construct; the URL comes out
        // malformed. No recovery is defined for this case.
        let mut record = photo_record();
        record["farm"] = json!({ "bogus": true });

        let photo = Photo::from_record(&record).unwrap();
        assert_eq!(photo.farm_id, 0);
        assert!(photo.url(SizeCode::SmallSquare).contains("farm0."));
    }

    #[test]
    fn test_photo_extras_keep_unpromoted_fields() {
        let photo = Photo::from_record(&photo_record()).unwrap();
        assert_eq!(photo.extra("isprimary"), Some(&json!("1")));
        assert!(photo.extra("id").is_none());
    }

    fn photoset_record() -> Value {
        json!({
            "id": "72157658305686922",
            "primary": "21231207825",
            "secret": "a0fb1361eb",
            "server": "756",
            "farm": 1,
            "photos": "9",
            "title": { "_content": "September 2015" },
            "description": { "_content": "" },
            "date_create": "1441674895"
        })
    }

    #[test]
    fn test_photoset_url_with_and_without_owner() {
        let with_owner =
            Photoset::from_record(&photoset_record(), Some("132044853@N08")).unwrap();
        assert_eq!(
            with_owner.url(),
            "https://www.flickr.com/photos/132044853@N08/sets/72157658305686922"
        );

        let without_owner = Photoset::from_record(&photoset_record(), None).unwrap();
        assert_eq!(without_owner.url(), "");
    }

    #[test]
    fn test_photoset_requires_id_and_title() {
        let mut record = photoset_record();
        record.as_object_mut().unwrap().remove("id");
        assert!(Photoset::from_record(&record, None).is_none());

        let mut record = photoset_record();
        record.as_object_mut().unwrap().remove("title");
        assert!(Photoset::from_record(&record, None).is_none());

        let mut record = photoset_record();
        record["title"] = json!({ "_content": "" });
        assert!(Photoset::from_record(&record, None).is_none());
    }

    #[test]
    fn test_photoset_extras() {
        let set = Photoset::from_record(&photoset_record(), None).unwrap();
        assert_eq!(set.extra("date_create"), Some(&json!("1441674895")));
        assert_eq!(set.extra("photos"), Some(&json!("9")));
    }

    #[test]
    fn test_models_round_trip_through_serde() {
        let photo = Photo::from_record(&photo_record()).unwrap();
        let back: Photo =
            serde_json::from_value(serde_json::to_value(&photo).unwrap()).unwrap();
        assert_eq!(back, photo);

        let set = Photoset::from_record(&photoset_record(), Some("132044853@N08")).unwrap();
        let back: Photoset =
            serde_json::from_value(serde_json::to_value(&set).unwrap()).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_size_codes_are_distinct() {
        let mut seen: Vec<char> = SizeCode::ALL.iter().map(SizeCode::as_char).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 11);
    }
}
