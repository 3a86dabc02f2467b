//! Building search queries from command-line arguments.

use ac_client::{Condition, ConditionSet, SearchQuery};
use anyhow::{bail, Result};

/// Parses one `--where` criterion.
///
/// Accepted forms: `prop=value`, `prop!=value`, `prop~value` (contains),
/// `prop?` (is null) and `prop!?` (is not null).
pub fn parse_condition(criterion: &str) -> Result<Condition> {
    let criterion = criterion.trim();

    if let Some((property, value)) = criterion.split_once("!=") {
        return Ok(Condition::equals(checked(property, criterion)?, value.trim()).negated(true));
    }
    if let Some((property, value)) = criterion.split_once('~') {
        return Ok(Condition::contains(checked(property, criterion)?, value.trim()));
    }
    if let Some((property, value)) = criterion.split_once('=') {
        return Ok(Condition::equals(checked(property, criterion)?, value.trim()));
    }
    if let Some(property) = criterion.strip_suffix("!?") {
        return Ok(Condition::is_null(checked(property, criterion)?, true));
    }
    if let Some(property) = criterion.strip_suffix('?') {
        return Ok(Condition::is_null(checked(property, criterion)?, false));
    }
    bail!(
        "Invalid criterion '{}': expected prop=value, prop!=value, prop~value, prop? or prop!?",
        criterion
    )
}

fn checked<'a>(property: &'a str, criterion: &str) -> Result<&'a str> {
    let property = property.trim();
    if property.is_empty() {
        bail!("Invalid criterion '{}': missing property name", criterion);
    }
    Ok(property)
}

/// Arguments of the `search` command.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub types: Vec<String>,
    pub criteria: Vec<String>,
    pub match_any: bool,
    pub properties: Vec<String>,
    pub sort: Option<String>,
    pub descending: bool,
    pub page_size: Option<u32>,
    pub begin: Option<u32>,
    pub drafts: bool,
}

/// Builds the search request.
pub fn build_query(args: &SearchArgs) -> Result<SearchQuery> {
    let Some((first, rest)) = args.types.split_first() else {
        bail!("At least one asset type is required");
    };

    let mut conditions = ConditionSet::new();
    for criterion in &args.criteria {
        conditions.add_condition(parse_condition(criterion)?);
    }
    conditions.set_match_any_condition(args.match_any);

    let mut query = SearchQuery::with_conditions(first, conditions);
    for asset_type in rest {
        query.add_type(asset_type);
    }
    if !args.properties.is_empty() {
        let properties: Vec<&str> = args.properties.iter().map(String::as_str).collect();
        query.set_properties(&properties);
    }
    if let Some(sort) = &args.sort {
        query.add_sort(sort, !args.descending);
    }
    if let Some(page_size) = args.page_size {
        query.set_page_size(page_size);
    }
    if let Some(begin) = args.begin {
        query.set_begin(begin);
    }
    query.set_dev_glossary(args.drafts);
    Ok(query)
}
