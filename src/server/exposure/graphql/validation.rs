//! Document checks performed before execution

use crate::core::error::GraphQLError;
use graphql_parser::query::{FragmentDefinition, Selection, SelectionSet};
use std::collections::HashMap;

pub type Fragments<'a> = HashMap<&'a str, &'a FragmentDefinition<'a, String>>;

/// Nesting depth of a selection set
///
/// Root fields sit at depth 0 and every nested selection set adds one.
/// Introspection fields are ignored. Fragment spreads must resolve and must
/// not form a cycle.
pub fn query_depth<'a>(
    selection_set: &'a SelectionSet<'a, String>,
    fragments: &Fragments<'a>,
) -> Result<usize, GraphQLError> {
    let mut visiting = Vec::new();
    depth_of(selection_set, fragments, 0, &mut visiting)
}

/// Reject operations nested deeper than `max`
pub fn check_depth<'a>(
    selection_set: &'a SelectionSet<'a, String>,
    fragments: &Fragments<'a>,
    max: usize,
) -> Result<(), GraphQLError> {
    let depth = query_depth(selection_set, fragments)?;
    if depth > max {
        return Err(GraphQLError::DepthLimitExceeded { max, depth });
    }
    Ok(())
}

fn depth_of<'a>(
    selection_set: &'a SelectionSet<'a, String>,
    fragments: &Fragments<'a>,
    current: usize,
    visiting: &mut Vec<&'a str>,
) -> Result<usize, GraphQLError> {
    let mut deepest = current;
    for selection in &selection_set.items {
        let depth = match selection {
            Selection::Field(field) => {
                if field.name.starts_with("__") || field.selection_set.items.is_empty() {
                    current
                } else {
                    depth_of(&field.selection_set, fragments, current + 1, visiting)?
                }
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                let fragment = fragments
                    .get(name)
                    .copied()
                    .ok_or_else(|| GraphQLError::UnknownFragment {
                        name: name.to_string(),
                    })?;
                if visiting.contains(&name) {
                    return Err(GraphQLError::InvalidOperation {
                        operation: name.to_string(),
                        message: "fragment spreads form a cycle".to_string(),
                    });
                }
                visiting.push(name);
                let depth = depth_of(&fragment.selection_set, fragments, current, visiting)?;
                visiting.pop();
                depth
            }
            Selection::InlineFragment(inline) => {
                depth_of(&inline.selection_set, fragments, current, visiting)?
            }
        };
        deepest = deepest.max(depth);
    }
    Ok(deepest)
}
