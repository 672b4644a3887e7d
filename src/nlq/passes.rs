//! Literal-preparation, comparator and property binding passes

use crate::models::{Comparator, Term, Value};
use crate::nlq::matcher::{Fragment, Pass};

fn raw(value: Value) -> Term {
    Term::Literal {
        property: String::new(),
        value,
        comparator: Comparator::Equal,
    }
}

/// Split compound literals like `10kb` into `10` + `kb`
pub struct SplitUnitsPass;

impl Pass for SplitUnitsPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let word = captures.first()?.as_ref()?.as_word()?;
        let digits: String = word.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest: String = word.chars().skip(digits.len()).collect();
        if digits.is_empty() || rest.is_empty() || !rest.chars().all(char::is_alphabetic) {
            return None;
        }
        Some(vec![
            raw(Value::String(digits)),
            raw(Value::String(rest)),
        ])
    }
}

/// Parse integer literals
pub struct NumbersPass;

impl Pass for NumbersPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let word = captures.first()?.as_ref()?.as_word()?;
        let value: i64 = word.parse().ok()?;
        Some(vec![raw(Value::Integer(value))])
    }
}

/// Fuse `int . int` into a decimal literal
pub struct DecimalValuesPass;

impl Pass for DecimalValuesPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let int_part = captures.first()?.as_ref()?.as_integer()?;
        let frac = captures.get(1)?.as_ref()?;
        let frac_part = frac.as_integer()?;
        if int_part < 0 || frac_part < 0 {
            return None;
        }
        let value: f64 = format!("{int_part}.{frac_part}").parse().ok()?;
        Some(vec![raw(Value::Float(value))])
    }
}

/// Fuse `<number> <unit>` into a byte-count literal
pub struct FileSizePass;

fn unit_multiplier(unit: &str) -> Option<i64> {
    match unit.to_lowercase().as_str() {
        "b" | "byte" | "bytes" => Some(1),
        "kb" => Some(1_000),
        "kib" => Some(1 << 10),
        "mb" => Some(1_000_000),
        "mib" => Some(1 << 20),
        "gb" => Some(1_000_000_000),
        "gib" => Some(1 << 30),
        "tb" => Some(1_000_000_000_000),
        "tib" => Some(1 << 40),
        _ => None,
    }
}

impl Pass for FileSizePass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let amount = captures.first()?.as_ref()?.as_integer()?;
        let unit = captures.get(1)?.as_ref()?.as_word()?;
        let multiplier = unit_multiplier(unit)?;
        Some(vec![raw(Value::Integer(amount.checked_mul(multiplier)?))])
    }
}

/// Map words like *mail*, *image* to the synthetic `_k_typehint` property
pub struct TypeHintsPass;

fn type_hint(word: &str) -> Option<&'static str> {
    match word {
        "file" | "files" => Some("File"),
        "image" | "images" | "picture" | "pictures" | "photo" | "photos" => Some("Image"),
        "video" | "videos" | "movie" | "movies" => Some("Video"),
        "music" | "audio" | "song" | "songs" => Some("Audio"),
        "document" | "documents" => Some("Document"),
        "mail" | "mails" | "email" | "emails" => Some("Email"),
        "note" | "notes" => Some("Note"),
        "folder" | "folders" | "directory" | "directories" => Some("Folder"),
        "archive" | "archives" => Some("Archive"),
        "contact" | "contacts" => Some("Contact"),
        _ => None,
    }
}

impl Pass for TypeHintsPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let word = captures.first()?.as_ref()?.as_word()?;
        let hint = type_hint(&word.to_lowercase())?;
        Some(vec![Term::literal(
            "_k_typehint",
            Value::String(hint.to_string()),
            Comparator::Equal,
        )])
    }
}

/// Rewrite shell-glob-like tokens to `filename contains` literals
pub struct FileNamesPass;

fn has_glob(word: &str) -> bool {
    word.contains('*') || word.contains('?')
}

impl Pass for FileNamesPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let stem = captures.first()?.as_ref()?.as_word()?;
        let pattern = match captures.get(1).and_then(Option::as_ref) {
            // `stem . ext` split apart by the separator pass
            Some(ext_fragment) => {
                let ext = ext_fragment.as_word()?;
                if !has_glob(stem) && !has_glob(ext) {
                    return None;
                }
                format!("{stem}.{ext}")
            }
            None => {
                if !has_glob(stem) {
                    return None;
                }
                stem.to_string()
            }
        };
        Some(vec![Term::literal(
            "filename",
            Value::String(pattern),
            Comparator::Contains,
        )])
    }
}

/// Consume a comparator phrase and attach it to the following literal
pub struct ComparatorsPass {
    comparator: Comparator,
}

impl ComparatorsPass {
    pub fn new(comparator: Comparator) -> Self {
        Self { comparator }
    }
}

impl Pass for ComparatorsPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let fragment = captures.first()?.as_ref()?;
        match &fragment.term {
            Term::Literal {
                property, value, ..
            } => Some(vec![Term::Literal {
                property: property.clone(),
                value: value.clone(),
                comparator: self.comparator,
            }]),
            _ => None,
        }
    }
}

/// Value types accepted by a property binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    Integer,
    IntegerOrDouble,
    String,
    EmailAddress,
    Contact,
    Tag,
    DateTime,
}

impl PropertyType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            PropertyType::Integer => matches!(value, Value::Integer(_)),
            PropertyType::IntegerOrDouble => {
                matches!(value, Value::Integer(_) | Value::Float(_))
            }
            PropertyType::DateTime => matches!(value, Value::DateTime { .. }),
            PropertyType::String
            | PropertyType::EmailAddress
            | PropertyType::Contact
            | PropertyType::Tag => matches!(value, Value::String(_)),
        }
    }

    fn is_stringy(self) -> bool {
        matches!(
            self,
            PropertyType::String
                | PropertyType::EmailAddress
                | PropertyType::Contact
                | PropertyType::Tag
        )
    }
}

/// Consume a property phrase and bind the property to the adjacent
/// literal
pub struct PropertiesPass {
    property: String,
    ty: PropertyType,
}

impl PropertiesPass {
    pub fn new(property: &str, ty: PropertyType) -> Self {
        Self {
            property: property.to_string(),
            ty,
        }
    }
}

impl Pass for PropertiesPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let fragment = captures.first()?.as_ref()?;
        let Term::Literal {
            property,
            value,
            comparator,
        } = &fragment.term
        else {
            return None;
        };
        if !property.is_empty() || !self.ty.accepts(value) {
            return None;
        }

        // String comparisons default to substring matching
        let comparator = if self.ty.is_stringy() && *comparator == Comparator::Equal {
            Comparator::Contains
        } else {
            *comparator
        };

        Some(vec![Term::Literal {
            property: self.property.clone(),
            value: value.clone(),
            comparator,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlq::matcher::run_pass;

    fn fragment(word: &str) -> Fragment {
        Fragment::new(
            Term::literal("", Value::String(word.to_string()), Comparator::Equal),
            0,
            word.len(),
        )
    }

    #[test]
    fn test_split_units() {
        let mut fragments = vec![fragment("10kb")];
        run_pass(&mut fragments, &SplitUnitsPass, "%1");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].as_word(), Some("10"));
        assert_eq!(fragments[1].as_word(), Some("kb"));
    }

    #[test]
    fn test_numbers_then_filesize() {
        let mut fragments = vec![fragment("10"), fragment("kib")];
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &FileSizePass, "%1 %2");

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_integer(), Some(10_240));
    }

    #[test]
    fn test_decimal_values() {
        let mut fragments = vec![fragment("3"), fragment("."), fragment("14")];
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &DecimalValuesPass, "%1 . %2");

        assert_eq!(fragments.len(), 1);
        match &fragments[0].term {
            Term::Literal {
                value: Value::Float(f),
                ..
            } => assert!((f - 3.14).abs() < 1e-9),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_type_hint() {
        let mut fragments = vec![fragment("emails")];
        run_pass(&mut fragments, &TypeHintsPass, "%1");
        assert_eq!(fragments[0].term.property(), "_k_typehint");
    }

    #[test]
    fn test_comparator_binds_to_literal() {
        let mut fragments = vec![fragment("at"), fragment("least"), fragment("10")];
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(
            &mut fragments,
            &ComparatorsPass::new(Comparator::Greater),
            "at least %1",
        );

        assert_eq!(fragments.len(), 1);
        match &fragments[0].term {
            Term::Literal { comparator, .. } => assert_eq!(*comparator, Comparator::Greater),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_property_type_validation() {
        // "rated john" must not bind rating to a string
        let mut fragments = vec![fragment("rated"), fragment("john")];
        run_pass(
            &mut fragments,
            &PropertiesPass::new("rating", PropertyType::Integer),
            "rated %1",
        );
        assert_eq!(fragments.len(), 2);

        let mut fragments = vec![fragment("rated"), fragment("8")];
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(
            &mut fragments,
            &PropertiesPass::new("rating", PropertyType::Integer),
            "rated %1",
        );
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].term.property(), "rating");
    }

    #[test]
    fn test_string_property_defaults_to_contains() {
        let mut fragments = vec![fragment("titled"), fragment("report")];
        run_pass(
            &mut fragments,
            &PropertiesPass::new("subject", PropertyType::String),
            "titled %1",
        );
        match &fragments[0].term {
            Term::Literal { comparator, .. } => assert_eq!(*comparator, Comparator::Contains),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_glob_detection() {
        let mut fragments = vec![fragment("*"), fragment("."), fragment("png")];
        run_pass(&mut fragments, &FileNamesPass, "%1 . %2;%1");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].term.property(), "filename");

        let mut fragments = vec![fragment("report"), fragment("."), fragment("pdf")];
        run_pass(&mut fragments, &FileNamesPass, "%1 . %2;%1");
        assert_eq!(fragments.len(), 3);
    }
}
