//! Entity, column and model traits plus identifier introspection.
//!
//! An entity is a unit type describing a table; its `Model` is the row
//! struct; its `Column` enum names the attributes. [`EntityInformation`]
//! answers the identifier questions the query core needs: simple vs.
//! composite ids, optimistic-locking version attributes, new-vs-persisted
//! detection, and keyset extraction.

use std::collections::BTreeMap;

use sea_query::{Iden, IdenStatic, Value};

use crate::error::QuarryError;
use crate::executor::FromRow;
use crate::value::{is_null, is_null_or_zero};

/// An attribute of an entity, usable as a sea-query identifier.
pub trait ColumnTrait: Iden + IdenStatic + Copy + Eq + std::fmt::Debug + 'static {
    /// Every column of the entity, in declaration order.
    fn all() -> &'static [Self];

    /// Resolve a property name against the entity's attribute set.
    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == name)
    }

    /// Whether the column holds a nullable (boxed) value. Version columns
    /// must be nullable for the version-based "is new" check to apply.
    fn nullable(&self) -> bool {
        false
    }
}

/// A managed entity type.
pub trait EntityTrait: Default + Copy + 'static {
    type Model: ModelTrait<Entity = Self> + FromRow;
    type Column: ColumnTrait;

    fn table_name(&self) -> &'static str;

    /// Identifier attribute(s); more than one means a composite id.
    fn id_columns() -> &'static [Self::Column];

    /// Optional version attribute for optimistic locking.
    fn version_column() -> Option<Self::Column> {
        None
    }
}

/// Runtime access to a model's attribute values.
pub trait ModelTrait: Clone + std::fmt::Debug {
    type Entity: EntityTrait;

    /// The current value of a column.
    fn get(&self, column: <Self::Entity as EntityTrait>::Column) -> Value;
}

/// Identifier and version introspection for one entity type.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityInformation<E: EntityTrait> {
    entity: E,
}

impl<E: EntityTrait> EntityInformation<E> {
    pub fn new() -> Self {
        Self {
            entity: E::default(),
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.entity.table_name()
    }

    /// Whether the entity has more than one identifier attribute.
    ///
    /// Bulk id lookups must fall back to per-id queries in that case; an IN
    /// predicate over a composite id is not supported.
    pub fn has_composite_id(&self) -> bool {
        E::id_columns().len() > 1
    }

    /// Identifier attribute names, in declaration order.
    pub fn id_properties(&self) -> Vec<&'static str> {
        E::id_columns().iter().map(|c| c.as_str()).collect()
    }

    /// Identifier name → value map for a model instance.
    pub fn id_values(&self, model: &E::Model) -> BTreeMap<String, Value> {
        E::id_columns()
            .iter()
            .map(|c| (c.as_str().to_string(), model.get(*c)))
            .collect()
    }

    /// Whether the instance has never been persisted.
    ///
    /// A nullable version attribute decides when present: new iff the
    /// version is null. Otherwise the identifier heuristic applies: new iff
    /// every id value is null or zero-valued.
    pub fn is_new(&self, model: &E::Model) -> bool {
        if let Some(version) = E::version_column() {
            if version.nullable() {
                return is_null(&model.get(version));
            }
        }
        E::id_columns()
            .iter()
            .all(|c| is_null_or_zero(&model.get(*c)))
    }

    /// Extract the current values of the given property paths as a
    /// name → value map. Fails naming the first path that is not an
    /// attribute of the entity.
    pub fn keyset(
        &self,
        properties: &[String],
        model: &E::Model,
    ) -> Result<BTreeMap<String, Value>, QuarryError> {
        let mut keys = BTreeMap::new();
        for property in properties {
            let column = E::Column::from_name(property).ok_or_else(|| {
                QuarryError::InvalidUsage(format!(
                    "property '{property}' does not resolve against entity '{}'",
                    self.table_name()
                ))
            })?;
            keys.insert(property.clone(), model.get(column));
        }
        Ok(keys)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A small `users` entity shared by tests across the crate.

    use super::*;
    use crate::executor::Row;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct User;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum UserColumn {
        Id,
        Firstname,
        Lastname,
        Age,
        Version,
    }

    impl Iden for UserColumn {
        fn unquoted(&self) -> &str {
            self.as_str()
        }
    }

    impl IdenStatic for UserColumn {
        fn as_str(&self) -> &'static str {
            match self {
                UserColumn::Id => "id",
                UserColumn::Firstname => "firstname",
                UserColumn::Lastname => "lastname",
                UserColumn::Age => "age",
                UserColumn::Version => "version",
            }
        }
    }

    impl ColumnTrait for UserColumn {
        fn all() -> &'static [Self] {
            &[
                UserColumn::Id,
                UserColumn::Firstname,
                UserColumn::Lastname,
                UserColumn::Age,
                UserColumn::Version,
            ]
        }

        fn nullable(&self) -> bool {
            matches!(self, UserColumn::Version)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct UserModel {
        pub id: i64,
        pub firstname: String,
        pub lastname: String,
        pub age: i32,
        pub version: Option<i64>,
    }

    impl ModelTrait for UserModel {
        type Entity = User;

        fn get(&self, column: UserColumn) -> Value {
            match column {
                UserColumn::Id => Value::BigInt(Some(self.id)),
                UserColumn::Firstname => Value::String(Some(self.firstname.clone())),
                UserColumn::Lastname => Value::String(Some(self.lastname.clone())),
                UserColumn::Age => Value::Int(Some(self.age)),
                UserColumn::Version => Value::BigInt(self.version),
            }
        }
    }

    impl FromRow for UserModel {
        fn from_row(row: &Row) -> Result<Self, QuarryError> {
            Ok(UserModel {
                id: row.get("id")?,
                firstname: row.get("firstname")?,
                lastname: row.get("lastname")?,
                age: row.get("age")?,
                version: row.get("version").ok(),
            })
        }
    }

    impl EntityTrait for User {
        type Model = UserModel;
        type Column = UserColumn;

        fn table_name(&self) -> &'static str {
            "users"
        }

        fn id_columns() -> &'static [UserColumn] {
            &[UserColumn::Id]
        }

        fn version_column() -> Option<UserColumn> {
            Some(UserColumn::Version)
        }
    }

    pub fn user(id: i64, firstname: &str, lastname: &str, age: i32) -> UserModel {
        UserModel {
            id,
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            age,
            version: Some(0),
        }
    }

    // A composite-id entity for id-resolution tests.

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Enrollment;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum EnrollmentColumn {
        StudentId,
        CourseId,
        Grade,
    }

    impl Iden for EnrollmentColumn {
        fn unquoted(&self) -> &str {
            self.as_str()
        }
    }

    impl IdenStatic for EnrollmentColumn {
        fn as_str(&self) -> &'static str {
            match self {
                EnrollmentColumn::StudentId => "student_id",
                EnrollmentColumn::CourseId => "course_id",
                EnrollmentColumn::Grade => "grade",
            }
        }
    }

    impl ColumnTrait for EnrollmentColumn {
        fn all() -> &'static [Self] {
            &[
                EnrollmentColumn::StudentId,
                EnrollmentColumn::CourseId,
                EnrollmentColumn::Grade,
            ]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct EnrollmentModel {
        pub student_id: i64,
        pub course_id: i64,
        pub grade: String,
    }

    impl ModelTrait for EnrollmentModel {
        type Entity = Enrollment;

        fn get(&self, column: EnrollmentColumn) -> Value {
            match column {
                EnrollmentColumn::StudentId => Value::BigInt(Some(self.student_id)),
                EnrollmentColumn::CourseId => Value::BigInt(Some(self.course_id)),
                EnrollmentColumn::Grade => Value::String(Some(self.grade.clone())),
            }
        }
    }

    impl FromRow for EnrollmentModel {
        fn from_row(row: &Row) -> Result<Self, QuarryError> {
            Ok(EnrollmentModel {
                student_id: row.get("student_id")?,
                course_id: row.get("course_id")?,
                grade: row.get("grade")?,
            })
        }
    }

    impl EntityTrait for Enrollment {
        type Model = EnrollmentModel;
        type Column = EnrollmentColumn;

        fn table_name(&self) -> &'static str {
            "enrollments"
        }

        fn id_columns() -> &'static [EnrollmentColumn] {
            &[EnrollmentColumn::StudentId, EnrollmentColumn::CourseId]
        }
    }
}
