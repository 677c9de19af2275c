//! Schema registry: the fixed field tables of every [`DatasetKind`].
//!
//! The record parser reads raw records through these tables and the query validator resolves
//! `<id>_<field>` references against them. Adding a kind means adding one table here and one
//! parser in [`crate::ingestion::records`].

#[cfg(test)]
use crate::types::{Row, Value};
use crate::types::{DataType, DatasetKind};

/// What a query may do with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Used in a `WHERE` comparison.
    Filter,
    /// Used as an `ORDER` key.
    Sort,
    /// Used as a `GROUP` key.
    Group,
    /// Used as the input of a numeric aggregation (`MAX`, `MIN`, `AVG`, `SUM`).
    Aggregate,
}

/// How a field is represented in the raw source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawForm {
    /// The raw JSON type must equal the declared type.
    Plain,
    /// A number may arrive as a string of digits, a string may arrive as an integer.
    Digits,
}

/// A single named, typed field of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name as used after the `<id>_` prefix in queries.
    pub name: &'static str,
    /// Declared type of every stored value.
    pub data_type: DataType,
    /// Key of the value in a raw source record.
    pub raw_key: &'static str,
    /// Accepted raw representation.
    pub raw_form: RawForm,
    pub filterable: bool,
    pub sortable: bool,
    pub groupable: bool,
    pub aggregatable: bool,
}

impl Field {
    const fn new(name: &'static str, data_type: DataType, raw_key: &'static str) -> Self {
        Self {
            name,
            data_type,
            raw_key,
            raw_form: RawForm::Plain,
            filterable: true,
            sortable: true,
            groupable: true,
            aggregatable: matches!(data_type, DataType::Number),
        }
    }

    const fn text(name: &'static str, raw_key: &'static str) -> Self {
        Self::new(name, DataType::Utf8, raw_key)
    }

    const fn number(name: &'static str, raw_key: &'static str) -> Self {
        Self::new(name, DataType::Number, raw_key)
    }

    const fn digits(self) -> Self {
        Self {
            raw_form: RawForm::Digits,
            ..self
        }
    }

    /// Whether this field may be used in the given query position.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Filter => self.filterable,
            Capability::Sort => self.sortable,
            Capability::Group => self.groupable,
            Capability::Aggregate => self.aggregatable,
        }
    }
}

/// Ordered field list of one kind. Rows store values in this order.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub kind: DatasetKind,
    pub fields: &'static [Field],
}

impl Schema {
    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// A row with every field at its type's zero value.
    #[cfg(test)]
    pub(crate) fn blank_row(&self) -> Row {
        self.fields
            .iter()
            .map(|f| match f.data_type {
                DataType::Number => Value::Number(0.0),
                DataType::Utf8 => Value::Utf8(String::new()),
                DataType::Bool => Value::Bool(false),
            })
            .collect()
    }

    /// Returns the index and definition of a field by name, if present.
    pub fn field(&self, name: &str) -> Option<(usize, &'static Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
    }
}

static COURSES: Schema = Schema {
    kind: DatasetKind::Courses,
    fields: &[
        Field::text("dept", "Subject"),
        Field::text("id", "Course"),
        Field::number("avg", "Avg"),
        Field::text("instructor", "Professor"),
        Field::text("title", "Title"),
        Field::number("pass", "Pass"),
        Field::number("fail", "Fail"),
        Field::number("audit", "Audit"),
        Field::text("uuid", "id").digits(),
        Field::number("year", "Year").digits(),
    ],
};

static ROOMS: Schema = Schema {
    kind: DatasetKind::Rooms,
    fields: &[
        Field::text("fullname", "fullname"),
        Field::text("shortname", "shortname"),
        Field::text("number", "number"),
        Field::text("name", "name"),
        Field::text("address", "address"),
        Field::number("lat", "lat"),
        Field::number("lon", "lon"),
        Field::number("seats", "seats"),
        Field::text("type", "type"),
        Field::text("furniture", "furniture"),
        Field::text("href", "href"),
    ],
};

/// Field table of `kind`.
pub fn schema_for(kind: DatasetKind) -> &'static Schema {
    match kind {
        DatasetKind::Courses => &COURSES,
        DatasetKind::Rooms => &ROOMS,
    }
}

/// Whether `field_name` exists in `kind` and supports `capability`.
pub fn is_valid_field(kind: DatasetKind, field_name: &str, capability: Capability) -> bool {
    schema_for(kind)
        .field(field_name)
        .is_some_and(|(_, f)| f.supports(capability))
}

#[cfg(test)]
mod tests {
    use super::{Capability, RawForm, is_valid_field, schema_for};
    use crate::types::{DataType, DatasetKind};

    #[test]
    fn courses_fields_are_ordered_and_typed() {
        let schema = schema_for(DatasetKind::Courses);
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec![
                "dept",
                "id",
                "avg",
                "instructor",
                "title",
                "pass",
                "fail",
                "audit",
                "uuid",
                "year"
            ]
        );
        let (idx, avg) = schema.field("avg").unwrap();
        assert_eq!(idx, 2);
        assert_eq!(avg.data_type, DataType::Number);
        assert_eq!(avg.raw_key, "Avg");
        assert_eq!(schema.field("uuid").unwrap().1.raw_form, RawForm::Digits);
        assert_eq!(schema.index_of("seats"), None);
    }

    #[test]
    fn only_numeric_fields_are_aggregatable() {
        assert!(is_valid_field(DatasetKind::Rooms, "seats", Capability::Aggregate));
        assert!(!is_valid_field(DatasetKind::Rooms, "furniture", Capability::Aggregate));
        assert!(is_valid_field(DatasetKind::Rooms, "furniture", Capability::Group));
        assert!(is_valid_field(DatasetKind::Courses, "dept", Capability::Filter));
        assert!(is_valid_field(DatasetKind::Courses, "year", Capability::Sort));
    }

    #[test]
    fn unknown_fields_are_never_valid() {
        assert!(!is_valid_field(DatasetKind::Courses, "seats", Capability::Filter));
        assert!(!is_valid_field(DatasetKind::Rooms, "avg", Capability::Sort));
        assert!(!is_valid_field(DatasetKind::Rooms, "", Capability::Group));
    }
}
