//! Region configuration.
//!
//! A region is one guild: its monitored AO channels, the store namespace its
//! records land in, and the channel that receives the monthly summary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::ids::{ChannelId, GuildId};

/// Store namespaces become database names, so keep them to a safe alphabet.
static NAMESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("invalid namespace pattern"));

fn validate_namespace(namespace: &str) -> std::result::Result<(), ValidationError> {
    if NAMESPACE_REGEX.is_match(namespace) {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_namespace");
    err.message = Some(format!("namespace {namespace:?} must match [a-z0-9_]+").into());
    Err(err)
}

/// Read-only region configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegionConfig {
    /// Display name (e.g. "f3pugetsound")
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Guild the region's channels live in
    pub guild_id: GuildId,
    /// Store namespace (database) for this region's records
    #[validate(length(min = 1, max = 64), custom(function = "validate_namespace"))]
    pub namespace: String,
    /// Channels scanned for backblasts
    #[validate(length(min = 1))]
    pub monitored_channels: Vec<ChannelId>,
    /// Channel that receives the monthly summary
    pub reporting_channel: ChannelId,
}

impl RegionConfig {
    /// Validates a region, mapping failures to a configuration error.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::config(format!("region {}: {}", self.name, e)))
    }
}

/// Validates a full region list.
///
/// Names and namespaces must be unique, and a channel may be monitored by
/// at most one region, since each channel has a single checkpoint.
pub fn validate_regions(regions: &[RegionConfig]) -> Result<()> {
    let mut names = HashSet::new();
    let mut namespaces = HashSet::new();
    let mut channels = HashMap::new();
    for region in regions {
        region.check()?;
        if !names.insert(region.name.as_str()) {
            return Err(Error::config(format!("duplicate region {}", region.name)));
        }
        if !namespaces.insert(region.namespace.as_str()) {
            return Err(Error::config(format!(
                "region {}: namespace {} is already used",
                region.name, region.namespace
            )));
        }
        for channel in &region.monitored_channels {
            if let Some(owner) = channels.insert(*channel, region.name.as_str()) {
                return Err(Error::config(format!(
                    "region {}: channel {} is already monitored by {}",
                    region.name, channel, owner
                )));
            }
        }
    }
    Ok(())
}
