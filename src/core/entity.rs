//! Entity tables and mutation inputs
//!
//! Rows travel through the system as JSON objects keyed by camelCase column
//! names (see [`Row`](crate::core::store::Row)). This module declares the
//! tables, their columns, and the typed inputs accepted by mutations.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// A table of the relational store
///
/// Table names double as GraphQL type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    MemberType,
    User,
    Post,
    Profile,
    SubscribersOnAuthors,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::MemberType,
        Table::User,
        Table::Post,
        Table::Profile,
        Table::SubscribersOnAuthors,
    ];

    /// Table (and GraphQL type) name
    pub fn name(&self) -> &'static str {
        match self {
            Table::MemberType => "MemberType",
            Table::User => "User",
            Table::Post => "Post",
            Table::Profile => "Profile",
            Table::SubscribersOnAuthors => "SubscribersOnAuthors",
        }
    }

    /// Columns stored for the table
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::MemberType => &["id", "discount", "postsLimitPerMonth"],
            Table::User => &["id", "name", "balance"],
            Table::Post => &["id", "title", "content", "authorId"],
            Table::Profile => &["id", "isMale", "yearOfBirth", "userId", "memberTypeId"],
            Table::SubscribersOnAuthors => &["subscriberId", "authorId"],
        }
    }

    /// Columns forming the primary key
    pub fn primary_key(&self) -> &'static [&'static str] {
        match self {
            Table::SubscribersOnAuthors => &["subscriberId", "authorId"],
            _ => &["id"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Resolve a GraphQL type name to its table
    pub fn from_type_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Member tier identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberTypeId {
    Basic,
    Business,
}

impl MemberTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberTypeId::Basic => "basic",
            MemberTypeId::Business => "business",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(MemberTypeId::Basic),
            "business" => Some(MemberTypeId::Business),
            _ => None,
        }
    }
}

fn validate_uuid(value: &str) -> Result<(), validator::ValidationError> {
    Uuid::parse_str(value).map(|_| ()).map_err(|_| {
        let mut err = validator::ValidationError::new("uuid");
        err.message = Some("must be a UUID".into());
        err
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 255, message = "must not be empty"))]
    pub name: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 255, message = "must not be empty"))]
    pub title: String,
    pub content: String,
    #[validate(custom(function = "validate_uuid"))]
    pub author_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileInput {
    pub is_male: bool,
    #[validate(range(min = 1900, max = 2100, message = "must be a plausible year"))]
    pub year_of_birth: i32,
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: String,
    pub member_type_id: MemberTypeId,
}

/// Partial update of a user; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "must not be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePostInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "must not be empty"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_uuid"))]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProfileInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_male: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1900, max = 2100, message = "must be a plausible year"))]
    pub year_of_birth: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_type_id: Option<MemberTypeId>,
}
