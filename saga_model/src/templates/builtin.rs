//! Built-in templates installed by the seed operation.

use super::{FieldType, NewTemplate};

/// The fixed set of templates every installation can seed, keyed by name.
pub fn builtin_templates() -> Vec<NewTemplate> {
    vec![
        NewTemplate::new("Character")
            .with_description("A template for characters in your story.")
            .with_field("Age", FieldType::Number)
            .with_field("Appearance", FieldType::Text)
            .with_field("Personality", FieldType::Text)
            .with_field("Backstory", FieldType::Text),
        NewTemplate::new("Location")
            .with_description("A template for locations in your world.")
            .with_field("Description", FieldType::Text)
            .with_field("History", FieldType::Text)
            .with_field("Inhabitants", FieldType::Text),
        NewTemplate::new("Magic System")
            .with_description("A template for a magic system.")
            .with_field("Rules", FieldType::Text)
            .with_field("Limitations", FieldType::Text)
            .with_field("Source of Power", FieldType::String),
    ]
}
