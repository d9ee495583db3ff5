//! Upgrades of stored datasets across schema versions.
//!
//! - 1.0 to 1.1 turns the legacy single-valued fields (creator, temporal
//!   extent, plain themes, free-text conforms-to) into their structured
//!   JSON forms and fills the fields that became mandatory with
//!   placeholders.
//! - 1.1 to 2.0 moves theme aggregates from the `theme` key to
//!   [`FIELD_THEMES_AGGREGATE`].
//!
//! Every step tolerates missing or broken source data. A dataset that still
//! fails to store is recorded in the [`MigrationReport`] and the batch moves
//! on.

use std::fmt;

use anyhow::Context;
use chrono::Local;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{DatasetStore, LocalizationStore, OrganizationStore, SiteUser};
use crate::config::DcatapitConfig;
use crate::dataset::{
    themes_from_str, ConformsTo, Creator, Dataset, TemporalCoverage, ThemeEntry, DEFAULT_FREQ_CODE,
    DEFAULT_THEME_KEY, FIELD_THEMES_AGGREGATE,
};
use crate::license::LicenseTaxonomy;
use crate::localization::LocalizedText;
use crate::validation::{normalize_date, validate_conforms_to, validate_temporal_coverage, validate_themes};

/// Prefix of the placeholder identifiers given to organizations without one.
pub const TEMP_IPA_CODE: &str = "tmp_ipa_code";

/// Prefix of the placeholder identifiers given to rights holders without one.
pub const TEMP_HOLDER_CODE: &str = "tmp_holder_code";

/// Catalog services a migration needs.
pub trait MigrationCatalog: DatasetStore + OrganizationStore + LocalizationStore + SiteUser {}

impl<T: DatasetStore + OrganizationStore + LocalizationStore + SiteUser> MigrationCatalog for T {}

/// Window and filters of a 1.0 to 1.1 batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Datasets to skip, in title order.
    pub offset: usize,
    /// Maximum number of datasets to process.
    pub limit: Option<usize>,
    /// Leave organizations untouched.
    pub skip_orgs: bool,
    /// Only process the datasets with these ids.
    pub dataset_ids: Option<Vec<String>>,
}

/// A dataset the batch could not store.
#[derive(Debug)]
pub struct MigrationFailure {
    /// Position of the dataset in the title-ordered listing.
    pub position: usize,
    /// Dataset name.
    pub name: String,
    /// Why it failed.
    pub error: anyhow::Error,
}

impl fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}: {:#}", self.name, self.position, self.error)
    }
}

/// Outcome of a 1.0 to 1.1 batch.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Organizations in the catalog.
    pub organizations_total: usize,
    /// Organizations that received a placeholder identifier.
    pub organizations_updated: usize,
    /// Datasets selected before windowing.
    pub datasets_total: usize,
    /// Datasets upgraded and stored.
    pub datasets_migrated: usize,
    /// Datasets that could not be stored.
    pub failures: Vec<MigrationFailure>,
}

/// Outcome of the 1.1 to 2.0 migration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThemeMigrationReport {
    /// Theme aggregates moved to the new key.
    pub migrated: usize,
    /// Datasets still carrying a pre-1.1 plain theme.
    pub obsolete_found: usize,
    /// Obsolete datasets upgraded through the 1.0 to 1.1 step.
    pub obsolete_migrated: usize,
}

/// Removes `key` from the dataset, returning the first non-empty value
/// found among the modeled field, the extras and the unmodeled keys.
fn take_value(dataset: &mut Dataset, key: &str) -> Option<String> {
    let field = dataset.field_mut(key).and_then(Option::take);
    let extra = dataset.take_extra(key);
    let other = match dataset.other.shift_remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    [field, extra, other]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
}

/// The theme given to datasets without one.
fn default_theme() -> Vec<ThemeEntry> {
    vec![ThemeEntry::new(DEFAULT_THEME_KEY)]
}

/// True for a theme value holding a serialized aggregate.
fn is_aggregate(value: &str) -> bool {
    value.contains("\"subthemes\"")
}

/// Runs schema upgrades against a catalog.
pub struct Migrator<'a, C: MigrationCatalog> {
    catalog: &'a mut C,
    licenses: &'a LicenseTaxonomy,
    default_lang: String,
    lang: String,
}

impl<C: MigrationCatalog> fmt::Debug for Migrator<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("default_lang", &self.default_lang)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl<'a, C: MigrationCatalog> Migrator<'a, C> {
    /// Creates a migrator. Legacy names are attributed to the default
    /// catalog language unless [`Migrator::with_lang`] says otherwise.
    pub fn new(catalog: &'a mut C, licenses: &'a LicenseTaxonomy, config: &DcatapitConfig) -> Self {
        Self {
            catalog,
            licenses,
            default_lang: config.default_lang.clone(),
            lang: config.default_lang.clone(),
        }
    }

    /// Sets the language legacy single-language values are written in.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Upgrades one dataset from the 1.0 to the 1.1 layout.
    ///
    /// The dataset is not stored.
    pub fn migrate_v1_to_v1_1(&mut self, mut dataset: Dataset) -> Dataset {
        Self::drop_empty(&mut dataset, "conforms_to");
        Self::drop_empty(&mut dataset, "alternate_identifier");
        self.update_creator(&mut dataset);
        Self::update_temporal_coverage(&mut dataset);
        Self::update_theme(&mut dataset);
        Self::update_identifier(&mut dataset);
        Self::update_modified(&mut dataset);
        Self::update_frequency(&mut dataset);
        self.update_conforms_to(&mut dataset);
        self.update_holder_info(&mut dataset);
        self.licenses.populate_resource_license(&mut dataset);
        dataset
    }

    /// Drops an empty structured value, empty JSON arrays included.
    fn drop_empty(dataset: &mut Dataset, key: &str) {
        let value = dataset.field_or_extra(key).map(str::trim);
        if matches!(value, None | Some("" | "[]")) && take_value(dataset, key).is_some() {
            debug!(dataset = %dataset.display_name(), field = key, "empty value dropped");
        }
    }

    /// Moves the legacy creator pair into the structured creator list.
    fn update_creator(&self, dataset: &mut Dataset) {
        if dataset.field("creator").is_some() {
            return;
        }
        let name = take_value(dataset, "creator_name");
        let identifier = take_value(dataset, "creator_identifier");
        if name.is_none() && identifier.is_none() {
            return;
        }
        let mut creator_name = LocalizedText::new();
        if let Some(name) = name {
            creator_name.insert(self.lang.clone(), name);
        }
        let creator = Creator {
            creator_identifier: identifier,
            creator_name,
        };
        if let Err(err) = dataset.set_creators(&[creator]) {
            error!(dataset = %dataset.display_name(), error = %err, "cannot store creator");
        }
    }

    /// Moves the legacy start/end pair into the temporal coverage list.
    fn update_temporal_coverage(dataset: &mut Dataset) {
        if dataset.field("temporal_coverage").is_some() {
            return;
        }
        let name = dataset.display_name().to_string();
        let read = |raw: Option<String>, which: &str| {
            let raw = raw?;
            let date = normalize_date(&raw);
            if date.is_none() {
                error!(dataset = %name, value = %raw, which, "unusable temporal coverage date");
            }
            date
        };
        let start = read(take_value(dataset, "temporal_start"), "start");
        let mut end = read(take_value(dataset, "temporal_end"), "end");
        let Some(start) = start else {
            return;
        };
        if end.as_deref() == Some(start.as_str()) {
            info!(dataset = %name, date = %start, "same temporal coverage start and end, using start only");
            end = None;
        }
        let coverage = [TemporalCoverage {
            temporal_start: Some(start),
            temporal_end: end,
        }];
        let checked = serde_json::to_string(&coverage)
            .map_err(Into::into)
            .and_then(|raw| validate_temporal_coverage(&raw));
        match checked {
            Ok(()) => {
                if let Err(err) = dataset.set_temporal_coverages(&coverage) {
                    error!(dataset = %name, error = %err, "cannot store temporal coverage");
                }
            },
            Err(err) => error!(dataset = %name, error = %err, "cannot use temporal coverage"),
        }
    }

    /// Rewrites a plain theme list as an aggregate, kept under `theme`.
    fn update_theme(dataset: &mut Dataset) {
        if dataset.field_or_extra(FIELD_THEMES_AGGREGATE).is_some() {
            return;
        }
        let entries = match take_value(dataset, "theme") {
            Some(raw) => {
                let entries = themes_from_str(&raw);
                let checked = serde_json::to_string(&entries)
                    .map_err(Into::into)
                    .and_then(|json| validate_themes(&json));
                match checked {
                    Ok(entries) => entries,
                    Err(err) => {
                        error!(dataset = %dataset.display_name(), theme = %raw, error = %err, "cannot use theme");
                        default_theme()
                    },
                }
            },
            None => default_theme(),
        };
        match serde_json::to_string(&entries) {
            Ok(json) => dataset.theme = Some(json),
            Err(err) => error!(dataset = %dataset.display_name(), error = %err, "cannot store theme"),
        }
    }

    fn update_identifier(dataset: &mut Dataset) {
        let identifier = take_value(dataset, "identifier").unwrap_or_else(|| {
            warn!(dataset = %dataset.display_name(), "no identifier, generating a new one");
            Uuid::new_v4().to_string()
        });
        dataset.identifier = Some(identifier);
    }

    /// The modification date becomes the migration date.
    fn update_modified(dataset: &mut Dataset) {
        let previous = take_value(dataset, "modified");
        if previous.as_deref().and_then(normalize_date).is_none() {
            info!(dataset = %dataset.display_name(), value = ?previous, "invalid modified date, using today");
        }
        dataset.modified = Some(Local::now().format("%Y-%m-%d").to_string());
    }

    fn update_frequency(dataset: &mut Dataset) {
        let frequency = take_value(dataset, "frequency").unwrap_or_else(|| {
            info!(dataset = %dataset.display_name(), "no frequency, using {DEFAULT_FREQ_CODE}");
            DEFAULT_FREQ_CODE.to_string()
        });
        dataset.frequency = Some(frequency);
    }

    /// Turns a free-text conforms-to value, and its stored translations,
    /// into a single standard.
    fn update_conforms_to(&mut self, dataset: &mut Dataset) {
        let Some(raw) = take_value(dataset, "conforms_to") else {
            return;
        };
        match validate_conforms_to(&raw) {
            Ok(()) => {
                dataset.conforms_to = Some(raw);
                return;
            },
            Err(err) if raw.trim_start().starts_with('[') => {
                error!(dataset = %dataset.display_name(), error = %err, "conforms_to present, but invalid");
            },
            Err(_) => {},
        }

        let dataset_id = dataset.id.clone().unwrap_or_default();
        let translations = self
            .catalog
            .package_fields(&dataset_id)
            .shift_remove("conforms_to")
            .unwrap_or_default();
        let identifier = translations
            .get("it")
            .or_else(|| translations.get(&self.default_lang))
            .cloned()
            .unwrap_or_else(|| raw.clone());
        let standard = ConformsTo {
            identifier,
            description: translations,
            ..ConformsTo::default()
        };
        self.catalog.delete_package_field(&dataset_id, "conforms_to");
        if let Err(err) = dataset.set_conforms_to(&[standard]) {
            error!(dataset = %dataset.display_name(), error = %err, "cannot store conforms_to");
        }
    }

    /// Gives a placeholder identifier to a named holder without one.
    fn update_holder_info(&self, dataset: &mut Dataset) {
        if dataset.field_or_extra("holder_name").is_none()
            || dataset.field_or_extra("holder_identifier").is_some()
        {
            return;
        }
        let count = self
            .catalog
            .count_values_with_prefix("holder_identifier", TEMP_HOLDER_CODE);
        let identifier = format!("{TEMP_HOLDER_CODE}_{}", count + 1);
        info!(
            dataset = %dataset.display_name(),
            holder = ?dataset.field_or_extra("holder_name"),
            identifier = %identifier,
            "holder without identifier, using generated one"
        );
        dataset.holder_identifier = Some(identifier);
    }

    /// Gives placeholder identifiers to organizations without one. Returns
    /// the number of organizations updated.
    fn update_organizations(&mut self) -> usize {
        let names = self.catalog.organization_names();
        let total = names.len();
        info!(count = total, "processing organizations");
        let mut updated = 0;
        for (idx, name) in names.iter().enumerate() {
            let Some(org) = self.catalog.show_organization(name) else {
                continue;
            };
            debug!(position = idx + 1, total, organization = %org.name, "processing organization");
            if org.identifier.as_deref().is_some_and(|i| !i.is_empty()) {
                continue;
            }
            let count = self.catalog.count_identifiers_with_prefix(TEMP_IPA_CODE);
            let identifier = format!("{TEMP_IPA_CODE}_{}", count + 1);
            info!(organization = %org.name, identifier = %identifier, "setting temporary identifier");
            match self.catalog.set_organization_identifier(&org.id, &identifier) {
                Ok(()) => updated += 1,
                Err(err) => error!(organization = %org.name, error = %err, "cannot set identifier"),
            }
        }
        updated
    }

    /// Upgrades every selected dataset from 1.0 to 1.1 and stores it.
    ///
    /// Datasets are processed in title order. A dataset that fails to store
    /// is recorded and the batch continues.
    pub fn run_v1_to_v1_1(&mut self, options: &BatchOptions) -> MigrationReport {
        info!(user = %self.catalog.site_user(), "starting 1.0 to 1.1 migration");
        let mut report = MigrationReport::default();
        if options.skip_orgs {
            info!("skipping organizations processing");
        } else {
            report.organizations_total = self.catalog.organization_names().len();
            report.organizations_updated = self.update_organizations();
        }

        let names = self.catalog.dataset_names(options.dataset_ids.as_deref());
        report.datasets_total = names.len();
        info!(count = report.datasets_total, "processing datasets");
        let window = names
            .into_iter()
            .enumerate()
            .skip(options.offset)
            .take(options.limit.unwrap_or(usize::MAX));
        for (position, name) in window {
            debug!(position = position + 1, total = report.datasets_total, dataset = %name, "processing dataset");
            let outcome = self
                .catalog
                .show_dataset(&name)
                .with_context(|| format!("dataset {name} vanished"))
                .and_then(|dataset| {
                    let upgraded = self.migrate_v1_to_v1_1(dataset);
                    self.catalog
                        .update_dataset(upgraded)
                        .with_context(|| format!("cannot update dataset {name}"))
                });
            match outcome {
                Ok(()) => report.datasets_migrated += 1,
                Err(err) => {
                    error!(dataset = %name, error = %format!("{err:#}"), "dataset not migrated");
                    report.failures.push(MigrationFailure {
                        position,
                        name,
                        error: err,
                    });
                },
            }
        }

        if !options.skip_orgs {
            info!(
                updated = report.organizations_updated,
                total = report.organizations_total,
                "organizations processed"
            );
        }
        info!(
            migrated = report.datasets_migrated,
            total = report.datasets_total,
            "datasets processed"
        );
        if !report.failures.is_empty() {
            info!(count = report.failures.len(), "following datasets failed");
            for failure in &report.failures {
                info!("{failure}");
            }
        }
        report
    }

    /// Moves aggregates stored under `theme` to the aggregate key. Returns
    /// the number of datasets moved.
    fn migrate_themes(&mut self) -> usize {
        let mut migrated = 0;
        for name in self.catalog.dataset_names(None) {
            let Some(mut dataset) = self.catalog.show_dataset(&name) else {
                continue;
            };
            let Some(raw) = dataset.field_or_extra("theme").map(str::to_string) else {
                continue;
            };
            if !is_aggregate(&raw) {
                continue;
            }
            take_value(&mut dataset, "theme");
            dataset.themes_aggregate = Some(raw);
            match self.catalog.update_dataset(dataset) {
                Ok(()) => migrated += 1,
                Err(err) => error!(dataset = %name, error = %err, "cannot migrate theme"),
            }
        }
        migrated
    }

    /// Ids of datasets whose `theme` still holds a pre-1.1 plain list.
    fn obsolete_themes(&self) -> Vec<String> {
        self.catalog
            .dataset_names(None)
            .iter()
            .filter_map(|name| self.catalog.show_dataset(name))
            .filter(|ds| ds.field_or_extra("theme").is_some_and(|t| !is_aggregate(t)))
            .filter_map(|ds| ds.id.or(ds.name))
            .collect()
    }

    /// Upgrades the catalog from 1.1 to 2.0.
    ///
    /// With `fix_old`, datasets still carrying a plain theme are run through
    /// the 1.0 to 1.1 step first (organizations untouched) and then moved
    /// like the others.
    pub fn migrate_v1_1_to_v2(&mut self, fix_old: bool) -> ThemeMigrationReport {
        let mut report = ThemeMigrationReport {
            migrated: self.migrate_themes(),
            ..ThemeMigrationReport::default()
        };
        info!(count = report.migrated, "theme extra keys migrated");

        let obsolete = self.obsolete_themes();
        report.obsolete_found = obsolete.len();
        if !obsolete.is_empty() {
            error!(count = obsolete.len(), "themes in the 1.0 plain format found");
            if fix_old {
                debug!(ids = ?obsolete, "obsolete datasets");
                let options = BatchOptions {
                    skip_orgs: true,
                    dataset_ids: Some(obsolete),
                    ..BatchOptions::default()
                };
                report.obsolete_migrated = self.run_v1_to_v1_1(&options).datasets_migrated;
                report.migrated += self.migrate_themes();
            }
        }

        info!(
            migrated = report.migrated,
            obsolete_found = report.obsolete_found,
            obsolete_migrated = report.obsolete_migrated,
            "theme migration summary"
        );
        if !fix_old && report.obsolete_found > 0 {
            info!("rerun with fix_old to upgrade the pre-1.1 datasets");
        }
        report
    }
}
