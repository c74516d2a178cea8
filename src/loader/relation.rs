//! Relation descriptors and the resolvers that batch them
//!
//! Each relation of the graph is described statically by a
//! [`RelationDescriptor`]. A [`RelationResolver`] turns a descriptor into a
//! bulk fetch (one store query for all parent keys of a batch) and
//! re-associates the returned rows with their parent keys.

use super::batcher::Batcher;
use super::registry::ScopeHandle;
use super::LoadContext;
use crate::core::entity::Table;
use crate::core::error::LoaderError;
use crate::core::store::{JoinSpec, LinkedRow, Row, RowFilter, Store, row_key};
use anyhow::Result;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;

/// How many child rows a parent owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Where the child rows of a relation live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Rows of `table` whose `column` equals the parent key
    Column { table: Table, column: &'static str },
    /// Rows of `target` reached through an edge table
    Through { target: Table, join: JoinSpec },
}

/// Static description of one relation field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Stable name, used for logging and batcher labels
    pub name: &'static str,
    /// GraphQL type declaring the field
    pub parent_type: &'static str,
    /// Field name on the parent type
    pub field: &'static str,
    pub cardinality: Cardinality,
    /// Parent column holding the key (its `id`, or a foreign key)
    pub parent_key: &'static str,
    pub lookup: Lookup,
}

impl RelationDescriptor {
    /// Table (and GraphQL type) of the related rows
    pub fn child_table(&self) -> Table {
        match self.lookup {
            Lookup::Column { table, .. } => table,
            Lookup::Through { target, .. } => target,
        }
    }

    /// Descriptor declared for `parent_type.field`, if any
    pub fn find(parent_type: &str, field: &str) -> Option<&'static RelationDescriptor> {
        RELATIONS
            .iter()
            .find(|r| r.parent_type == parent_type && r.field == field)
    }
}

pub const USER_PROFILE: RelationDescriptor = RelationDescriptor {
    name: "User.profile",
    parent_type: "User",
    field: "profile",
    cardinality: Cardinality::One,
    parent_key: "id",
    lookup: Lookup::Column {
        table: Table::Profile,
        column: "userId",
    },
};

pub const USER_POSTS: RelationDescriptor = RelationDescriptor {
    name: "User.posts",
    parent_type: "User",
    field: "posts",
    cardinality: Cardinality::Many,
    parent_key: "id",
    lookup: Lookup::Column {
        table: Table::Post,
        column: "authorId",
    },
};

/// Authors the user subscribes to: edges owned by `subscriberId`
pub const USER_SUBSCRIBED_TO: RelationDescriptor = RelationDescriptor {
    name: "User.userSubscribedTo",
    parent_type: "User",
    field: "userSubscribedTo",
    cardinality: Cardinality::Many,
    parent_key: "id",
    lookup: Lookup::Through {
        target: Table::User,
        join: JoinSpec {
            table: Table::SubscribersOnAuthors,
            owner_column: "subscriberId",
            target_column: "authorId",
        },
    },
};

/// Subscribers of the user: edges owned by `authorId`
pub const SUBSCRIBED_TO_USER: RelationDescriptor = RelationDescriptor {
    name: "User.subscribedToUser",
    parent_type: "User",
    field: "subscribedToUser",
    cardinality: Cardinality::Many,
    parent_key: "id",
    lookup: Lookup::Through {
        target: Table::User,
        join: JoinSpec {
            table: Table::SubscribersOnAuthors,
            owner_column: "authorId",
            target_column: "subscriberId",
        },
    },
};

pub const POST_AUTHOR: RelationDescriptor = RelationDescriptor {
    name: "Post.author",
    parent_type: "Post",
    field: "author",
    cardinality: Cardinality::One,
    parent_key: "authorId",
    lookup: Lookup::Column {
        table: Table::User,
        column: "id",
    },
};

pub const PROFILE_USER: RelationDescriptor = RelationDescriptor {
    name: "Profile.user",
    parent_type: "Profile",
    field: "user",
    cardinality: Cardinality::One,
    parent_key: "userId",
    lookup: Lookup::Column {
        table: Table::User,
        column: "id",
    },
};

pub const PROFILE_MEMBER_TYPE: RelationDescriptor = RelationDescriptor {
    name: "Profile.memberType",
    parent_type: "Profile",
    field: "memberType",
    cardinality: Cardinality::One,
    parent_key: "memberTypeId",
    lookup: Lookup::Column {
        table: Table::MemberType,
        column: "id",
    },
};

pub const MEMBER_TYPE_PROFILES: RelationDescriptor = RelationDescriptor {
    name: "MemberType.profiles",
    parent_type: "MemberType",
    field: "profiles",
    cardinality: Cardinality::Many,
    parent_key: "id",
    lookup: Lookup::Column {
        table: Table::Profile,
        column: "memberTypeId",
    },
};

/// Every relation of the graph
pub static RELATIONS: [RelationDescriptor; 8] = [
    USER_PROFILE,
    USER_POSTS,
    USER_SUBSCRIBED_TO,
    SUBSCRIBED_TO_USER,
    POST_AUTHOR,
    PROFILE_USER,
    PROFILE_MEMBER_TYPE,
    MEMBER_TYPE_PROFILES,
];

/// Rows related to one parent key
///
/// Rows are shared: every caller asking for the same key receives the same
/// `Arc`s.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Arc<Row>>),
    Many(Vec<Arc<Row>>),
}

impl Related {
    /// Empty value for a cardinality
    pub fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::One => Related::One(None),
            Cardinality::Many => Related::Many(Vec::new()),
        }
    }

    pub fn as_one(&self) -> Option<&Arc<Row>> {
        match self {
            Related::One(row) => row.as_ref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[Arc<Row>] {
        match self {
            Related::One(_) => &[],
            Related::Many(rows) => rows,
        }
    }
}

/// Batched resolver for one relation
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver {
    descriptor: &'static RelationDescriptor,
}

impl RelationResolver {
    pub fn new(descriptor: &'static RelationDescriptor) -> Self {
        Self { descriptor }
    }

    /// Resolver for `parent_type.field`
    ///
    /// Fails immediately when no descriptor is declared for the field.
    pub fn for_field(parent_type: &str, field: &str) -> Result<Self, LoaderError> {
        RelationDescriptor::find(parent_type, field)
            .map(Self::new)
            .ok_or_else(|| LoaderError::MissingDescriptor {
                parent_type: parent_type.to_string(),
                field: field.to_string(),
            })
    }

    pub fn descriptor(&self) -> &'static RelationDescriptor {
        self.descriptor
    }

    /// Key of the parent row for this relation
    pub fn parent_key(&self, parent: &Row) -> Option<String> {
        row_key(parent, self.descriptor.parent_key).filter(|k| !k.is_empty())
    }

    /// Batcher performing this relation's bulk fetch against `store`
    pub fn batcher(&self, store: Arc<dyn Store>) -> Batcher<Related> {
        let descriptor = self.descriptor;
        Batcher::new(descriptor.name, move |keys: Vec<String>| {
            let store = store.clone();
            async move { fetch_related(descriptor, store.as_ref(), &keys).await }.boxed()
        })
    }

    /// Resolve the relation for one parent within a field occurrence
    ///
    /// Parents sharing `handle` are coalesced into one bulk fetch. A parent
    /// without a key resolves to an empty value without touching the store.
    pub async fn resolve(
        &self,
        ctx: &LoadContext,
        handle: ScopeHandle,
        parent: &Row,
    ) -> Result<Related, LoaderError> {
        let Some(key) = self.parent_key(parent) else {
            return Ok(Related::empty(self.descriptor.cardinality));
        };
        let batcher = ctx
            .scopes
            .get_or_create(handle, || self.batcher(ctx.store.clone()));
        batcher.enqueue(key)?.await
    }
}

/// One store round trip for all `keys`, aligned 1:1 with them
pub async fn fetch_related(
    descriptor: &RelationDescriptor,
    store: &dyn Store,
    keys: &[String],
) -> Result<Vec<Related>> {
    match descriptor.lookup {
        Lookup::Column { table, column } => {
            let rows = store
                .find(table, &RowFilter::is_in(column, keys.to_vec()))
                .await?;
            Ok(group_by_column(descriptor.cardinality, column, keys, rows))
        }
        Lookup::Through { target, join } => {
            let linked = store.find_through(target, &join, keys).await?;
            Ok(group_linked(descriptor.cardinality, keys, linked))
        }
    }
}

/// Align rows with `keys` by the value of `column`
///
/// To-one relations keep the first matching row.
fn group_by_column(
    cardinality: Cardinality,
    column: &str,
    keys: &[String],
    rows: Vec<Row>,
) -> Vec<Related> {
    let mut grouped: HashMap<String, Vec<Arc<Row>>> = HashMap::new();
    for row in rows {
        if let Some(key) = row_key(&row, column) {
            grouped.entry(key).or_default().push(Arc::new(row));
        }
    }
    align(cardinality, keys, grouped)
}

/// Align joined rows with `keys`; a row linked to several owners is shared
fn group_linked(cardinality: Cardinality, keys: &[String], linked: Vec<LinkedRow>) -> Vec<Related> {
    let mut grouped: HashMap<String, Vec<Arc<Row>>> = HashMap::new();
    for LinkedRow { row, owners } in linked {
        let row = Arc::new(row);
        for owner in owners {
            grouped.entry(owner).or_default().push(row.clone());
        }
    }
    align(cardinality, keys, grouped)
}

fn align(
    cardinality: Cardinality,
    keys: &[String],
    mut grouped: HashMap<String, Vec<Arc<Row>>>,
) -> Vec<Related> {
    keys.iter()
        .map(|key| {
            let rows = grouped.remove(key).unwrap_or_default();
            match cardinality {
                Cardinality::One => Related::One(rows.into_iter().next()),
                Cardinality::Many => Related::Many(rows),
            }
        })
        .collect()
}
