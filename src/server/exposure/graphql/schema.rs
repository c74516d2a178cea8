//! Static schema of the API
//!
//! The executor does not consult the SDL at run time: scalar fields come
//! from [`Table::columns`] and relation fields from the relation
//! descriptors. The SDL is served as documentation at `/graphql/schema`
//! and kept in sync with both by the tests below.

use crate::core::entity::Table;
use crate::loader::RelationDescriptor;

pub const SCHEMA_SDL: &str = r#"enum MemberTypeId {
  basic
  business
}

scalar UUID

type MemberType {
  id: MemberTypeId
  discount: Float
  postsLimitPerMonth: Int
  profiles: [Profile]
}

type User {
  id: UUID
  name: String
  balance: Float
  profile: Profile
  posts: [Post]
  userSubscribedTo: [User]
  subscribedToUser: [User]
}

type Post {
  id: UUID
  title: String
  content: String
  authorId: String
  author: User
}

type Profile {
  id: UUID
  isMale: Boolean
  yearOfBirth: Int
  userId: String
  memberTypeId: MemberTypeId
  memberType: MemberType
  user: User
}

input CreateUserInput {
  name: String!
  balance: Float!
}

input CreatePostInput {
  title: String!
  content: String!
  authorId: String!
}

input CreateProfileInput {
  isMale: Boolean!
  yearOfBirth: Int!
  userId: String!
  memberTypeId: MemberTypeId!
}

input ChangeUserInput {
  name: String
  balance: Float
}

input ChangePostInput {
  title: String
  content: String
  authorId: String
}

input ChangeProfileInput {
  isMale: Boolean
  yearOfBirth: Int
  memberTypeId: MemberTypeId
}

type Query {
  memberTypes: [MemberType]
  users: [User]
  posts: [Post]
  profiles: [Profile]
  memberType(id: MemberTypeId!): MemberType
  user(id: UUID!): User
  post(id: UUID!): Post
  profile(id: UUID!): Profile
  subscribedToUser(id: UUID!): [User]
  userSubscribedTo(id: UUID!): [User]
}

type Mutation {
  createUser(dto: CreateUserInput!): User
  createPost(dto: CreatePostInput!): Post
  createProfile(dto: CreateProfileInput!): Profile
  deleteUser(id: UUID!): UUID
  deletePost(id: UUID!): UUID
  deleteProfile(id: UUID!): UUID
  changeUser(id: UUID!, dto: ChangeUserInput!): User
  changePost(id: UUID!, dto: ChangePostInput!): Post
  changeProfile(id: UUID!, dto: ChangeProfileInput!): Profile
  subscribeTo(userId: UUID!, authorId: UUID!): User
  unsubscribeFrom(userId: UUID!, authorId: UUID!): UUID
}
"#;

/// Kind of a field selected on an object type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `__typename`
    TypeName,
    /// Column read from the row
    Scalar,
    /// Relation resolved through the loader
    Relation(&'static RelationDescriptor),
}

/// Classify `field` on the object type backed by `table`
pub fn field_kind(table: Table, field: &str) -> Option<FieldKind> {
    if field == "__typename" {
        return Some(FieldKind::TypeName);
    }
    if let Some(descriptor) = RelationDescriptor::find(table.name(), field) {
        return Some(FieldKind::Relation(descriptor));
    }
    table.has_column(field).then_some(FieldKind::Scalar)
}
