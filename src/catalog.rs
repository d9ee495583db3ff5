//! Contracts of the catalog platform services the core calls into.
//!
//! The translator, the loader and the migration jobs never talk to storage
//! directly. They go through the traits below, which the embedding catalog
//! implements. [`MemoryCatalog`] implements all of them in memory and is what
//! the test suite runs against.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{DcatError, Result};
use crate::localization::LocalizedFields;
use crate::validation;

/// A publishing organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    /// Catalog id.
    pub id: String,
    /// URL-safe name.
    pub name: String,
    /// Display title.
    pub title: Option<String>,
    /// IPA code or other public identifier.
    pub identifier: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact telephone.
    pub telephone: Option<String>,
    /// Web site.
    pub site: Option<String>,
}

/// Looks up organizations by id or name.
pub trait OrganizationLookup {
    /// Returns the organization with the given id or name.
    fn organization(&self, id_or_name: &str) -> Option<Organization>;
}

/// Persistence of localized field values.
pub trait LocalizationStore {
    /// Localized values of a dataset's fields.
    fn package_fields(&self, dataset_id: &str) -> LocalizedFields;
    /// Localized values of a resource's fields.
    fn resource_fields(&self, resource_id: &str) -> LocalizedFields;
    /// Localized values of an organization's fields.
    fn organization_fields(&self, org_id: &str) -> LocalizedFields;
    /// Stores one localized dataset field value.
    fn set_package_field(&mut self, dataset_id: &str, field: &str, lang: &str, text: &str);
    /// Drops every localized value of a dataset field.
    fn delete_package_field(&mut self, dataset_id: &str, field: &str);
}

/// The catalog's own tag vocabularies.
pub trait TagRegistry {
    /// Makes sure `code` exists in `vocabulary`. Returns true if it was created.
    fn ensure_tag(&mut self, vocabulary: &str, code: &str) -> bool;
    /// Number of datasets tagged with `code`.
    fn reference_count(&self, vocabulary: &str, code: &str) -> usize;
    /// Deletes a tag. Returns true if it existed.
    fn delete_tag(&mut self, vocabulary: &str, code: &str) -> bool;
    /// Codes currently registered in `vocabulary`.
    fn tags(&self, vocabulary: &str) -> Vec<String>;
}

/// Dataset storage.
pub trait DatasetStore {
    /// Dataset names in title order, optionally restricted to the given ids.
    fn dataset_names(&self, ids: Option<&[String]>) -> Vec<String>;
    /// Loads a dataset by name.
    fn show_dataset(&self, name: &str) -> Option<Dataset>;
    /// Stores a dataset, validating its structured fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset does not exist or fails validation.
    fn update_dataset(&mut self, dataset: Dataset) -> Result<()>;

    /// Counts datasets whose `field` (or extra of that name) starts with `prefix`.
    fn count_values_with_prefix(&self, field: &str, prefix: &str) -> usize {
        self.dataset_names(None)
            .iter()
            .filter_map(|name| self.show_dataset(name))
            .filter(|ds| {
                ds.field_or_extra(field)
                    .is_some_and(|v| v.starts_with(prefix))
            })
            .count()
    }
}

/// Organization storage.
pub trait OrganizationStore {
    /// Organization names in title order.
    fn organization_names(&self) -> Vec<String>;
    /// Loads an organization by name.
    fn show_organization(&self, name: &str) -> Option<Organization>;
    /// Sets the public identifier of an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the organization does not exist.
    fn set_organization_identifier(&mut self, id: &str, identifier: &str) -> Result<()>;

    /// Counts organizations whose identifier starts with `prefix`.
    fn count_identifiers_with_prefix(&self, prefix: &str) -> usize {
        self.organization_names()
            .iter()
            .filter_map(|name| self.show_organization(name))
            .filter(|org| {
                org.identifier
                    .as_deref()
                    .is_some_and(|i| i.starts_with(prefix))
            })
            .count()
    }
}

/// Catalog groups used for theme based browsing.
pub trait GroupRegistry {
    /// Returns true if the group exists.
    fn group_exists(&self, name: &str) -> bool;
    /// Creates a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group already exists.
    fn create_group(&mut self, name: &str) -> Result<()>;
    /// Groups a dataset belongs to.
    fn dataset_groups(&self, dataset_id: &str) -> Vec<String>;
    /// Adds a dataset to an existing group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist.
    fn add_dataset_to_group(&mut self, dataset_id: &str, group: &str) -> Result<()>;
    /// Removes a dataset from every group.
    fn clear_dataset_groups(&mut self, dataset_id: &str);
}

/// Resolves the privileged account batch jobs run as.
pub trait SiteUser {
    /// Name of the site user.
    fn site_user(&self) -> String;
}

/// In-memory catalog implementing every collaborator contract.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    datasets: IndexMap<String, Dataset>,
    organizations: IndexMap<String, Organization>,
    localized_packages: HashMap<String, LocalizedFields>,
    localized_resources: HashMap<String, LocalizedFields>,
    localized_organizations: HashMap<String, LocalizedFields>,
    tags: IndexMap<String, IndexSet<String>>,
    tag_refs: HashMap<(String, String), usize>,
    groups: IndexSet<String>,
    dataset_groups: HashMap<String, IndexSet<String>>,
    site_user: String,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            datasets: IndexMap::new(),
            organizations: IndexMap::new(),
            localized_packages: HashMap::new(),
            localized_resources: HashMap::new(),
            localized_organizations: HashMap::new(),
            tags: IndexMap::new(),
            tag_refs: HashMap::new(),
            groups: IndexSet::new(),
            dataset_groups: HashMap::new(),
            site_user: "site_user".into(),
        }
    }
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a dataset, keyed by name. Missing ids are set to the name.
    pub fn insert_dataset(&mut self, mut dataset: Dataset) {
        let name = dataset.name.clone().unwrap_or_default();
        if dataset.id.is_none() {
            dataset.id = Some(name.clone());
        }
        self.datasets.insert(name, dataset);
    }

    /// Returns a stored dataset.
    #[must_use]
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    /// Adds or replaces an organization, keyed by id.
    pub fn insert_organization(&mut self, organization: Organization) {
        self.organizations
            .insert(organization.id.clone(), organization);
    }

    /// Records that one more dataset uses `code` from `vocabulary`.
    pub fn reference_tag(&mut self, vocabulary: &str, code: &str) {
        *self
            .tag_refs
            .entry((vocabulary.to_string(), code.to_string()))
            .or_default() += 1;
    }

    /// Stores a localized resource field value.
    pub fn set_resource_field(&mut self, resource_id: &str, field: &str, lang: &str, text: &str) {
        self.localized_resources
            .entry(resource_id.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .insert(lang.to_string(), text.to_string());
    }

    /// Stores a localized organization field value.
    pub fn set_organization_field(&mut self, org_id: &str, field: &str, lang: &str, text: &str) {
        self.localized_organizations
            .entry(org_id.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .insert(lang.to_string(), text.to_string());
    }
}

impl OrganizationLookup for MemoryCatalog {
    fn organization(&self, id_or_name: &str) -> Option<Organization> {
        self.organizations
            .get(id_or_name)
            .or_else(|| self.organizations.values().find(|o| o.name == id_or_name))
            .cloned()
    }
}

impl LocalizationStore for MemoryCatalog {
    fn package_fields(&self, dataset_id: &str) -> LocalizedFields {
        self.localized_packages
            .get(dataset_id)
            .cloned()
            .unwrap_or_default()
    }

    fn resource_fields(&self, resource_id: &str) -> LocalizedFields {
        self.localized_resources
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    fn organization_fields(&self, org_id: &str) -> LocalizedFields {
        self.localized_organizations
            .get(org_id)
            .cloned()
            .unwrap_or_default()
    }

    fn set_package_field(&mut self, dataset_id: &str, field: &str, lang: &str, text: &str) {
        self.localized_packages
            .entry(dataset_id.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .insert(lang.to_string(), text.to_string());
    }

    fn delete_package_field(&mut self, dataset_id: &str, field: &str) {
        if let Some(fields) = self.localized_packages.get_mut(dataset_id) {
            fields.shift_remove(field);
        }
    }
}

impl TagRegistry for MemoryCatalog {
    fn ensure_tag(&mut self, vocabulary: &str, code: &str) -> bool {
        self.tags
            .entry(vocabulary.to_string())
            .or_default()
            .insert(code.to_string())
    }

    fn reference_count(&self, vocabulary: &str, code: &str) -> usize {
        self.tag_refs
            .get(&(vocabulary.to_string(), code.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn delete_tag(&mut self, vocabulary: &str, code: &str) -> bool {
        self.tags
            .get_mut(vocabulary)
            .is_some_and(|codes| codes.shift_remove(code))
    }

    fn tags(&self, vocabulary: &str) -> Vec<String> {
        self.tags
            .get(vocabulary)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl DatasetStore for MemoryCatalog {
    fn dataset_names(&self, ids: Option<&[String]>) -> Vec<String> {
        let mut selected: Vec<&Dataset> = self
            .datasets
            .values()
            .filter(|ds| {
                ids.map_or(true, |ids| {
                    ds.id.as_ref().is_some_and(|id| ids.contains(id))
                })
            })
            .collect();
        selected.sort_by(|a, b| a.title.cmp(&b.title));
        selected
            .into_iter()
            .filter_map(|ds| ds.name.clone())
            .collect()
    }

    fn show_dataset(&self, name: &str) -> Option<Dataset> {
        self.datasets.get(name).cloned()
    }

    fn update_dataset(&mut self, dataset: Dataset) -> Result<()> {
        let name = dataset
            .name
            .clone()
            .ok_or_else(|| DcatError::invalid_field("name", "dataset has no name"))?;
        if !self.datasets.contains_key(&name) {
            return Err(DcatError::NotFound(format!("dataset {name}")));
        }
        if let Some(err) = validation::validate_dataset(&dataset).into_iter().next() {
            return Err(err);
        }
        debug!(dataset = %name, "dataset updated");
        self.datasets.insert(name, dataset);
        Ok(())
    }
}

impl OrganizationStore for MemoryCatalog {
    fn organization_names(&self) -> Vec<String> {
        let mut orgs: Vec<&Organization> = self.organizations.values().collect();
        orgs.sort_by(|a, b| a.title.cmp(&b.title));
        orgs.into_iter().map(|o| o.name.clone()).collect()
    }

    fn show_organization(&self, name: &str) -> Option<Organization> {
        self.organization(name)
    }

    fn set_organization_identifier(&mut self, id: &str, identifier: &str) -> Result<()> {
        let org = self
            .organizations
            .get_mut(id)
            .ok_or_else(|| DcatError::NotFound(format!("organization {id}")))?;
        org.identifier = Some(identifier.to_string());
        Ok(())
    }
}

impl GroupRegistry for MemoryCatalog {
    fn group_exists(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    fn create_group(&mut self, name: &str) -> Result<()> {
        if !self.groups.insert(name.to_string()) {
            return Err(DcatError::UniqueViolation(format!("group {name}")));
        }
        Ok(())
    }

    fn dataset_groups(&self, dataset_id: &str) -> Vec<String> {
        self.dataset_groups
            .get(dataset_id)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn add_dataset_to_group(&mut self, dataset_id: &str, group: &str) -> Result<()> {
        if !self.groups.contains(group) {
            return Err(DcatError::NotFound(format!("group {group}")));
        }
        self.dataset_groups
            .entry(dataset_id.to_string())
            .or_default()
            .insert(group.to_string());
        Ok(())
    }

    fn clear_dataset_groups(&mut self, dataset_id: &str) {
        self.dataset_groups.remove(dataset_id);
    }
}

impl SiteUser for MemoryCatalog {
    fn site_user(&self) -> String {
        self.site_user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(name: &str, title: &str) -> Dataset {
        Dataset {
            title: Some(title.into()),
            ..Dataset::named(name)
        }
    }

    #[test]
    fn test_dataset_names_are_title_ordered() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_dataset(dataset("b", "Zeta"));
        catalog.insert_dataset(dataset("a", "Alpha"));
        catalog.insert_dataset(dataset("c", "Mu"));
        assert_eq!(catalog.dataset_names(None), vec!["a", "c", "b"]);
        assert_eq!(
            catalog.dataset_names(Some(&["b".to_string()])),
            vec!["b"]
        );
    }

    #[test]
    fn test_update_rejects_invalid_structured_field() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_dataset(dataset("a", "Alpha"));
        let mut ds = catalog.show_dataset("a").expect("stored");
        ds.conforms_to = Some("[{}]".into());
        assert!(matches!(
            catalog.update_dataset(ds),
            Err(DcatError::InvalidField { .. })
        ));
        assert!(catalog.update_dataset(Dataset::named("missing")).is_err());
    }

    #[test]
    fn test_tags_and_references() {
        let mut catalog = MemoryCatalog::new();
        assert!(catalog.ensure_tag("eu_themes", "AGRI"));
        assert!(!catalog.ensure_tag("eu_themes", "AGRI"));
        catalog.reference_tag("eu_themes", "AGRI");
        assert_eq!(catalog.reference_count("eu_themes", "AGRI"), 1);
        assert_eq!(catalog.reference_count("eu_themes", "ECON"), 0);
        assert!(catalog.delete_tag("eu_themes", "AGRI"));
        assert!(catalog.tags("eu_themes").is_empty());
    }

    #[test]
    fn test_temp_code_counts() {
        let mut catalog = MemoryCatalog::new();
        let mut ds = dataset("a", "A");
        ds.holder_identifier = Some("tmp_holder_code_1".into());
        catalog.insert_dataset(ds);
        catalog.insert_dataset(dataset("b", "B"));
        assert_eq!(
            catalog.count_values_with_prefix("holder_identifier", "tmp_holder_code"),
            1
        );

        catalog.insert_organization(Organization {
            id: "o1".into(),
            name: "org".into(),
            identifier: Some("tmp_ipa_code_1".into()),
            ..Organization::default()
        });
        assert_eq!(catalog.count_identifiers_with_prefix("tmp_ipa_code"), 1);
        assert_eq!(catalog.organization("org").map(|o| o.id), Some("o1".into()));
    }

    #[test]
    fn test_groups() {
        let mut catalog = MemoryCatalog::new();
        assert!(catalog.add_dataset_to_group("ds", "agricoltura").is_err());
        catalog.create_group("agricoltura").expect("new group");
        assert!(catalog.create_group("agricoltura").is_err());
        catalog
            .add_dataset_to_group("ds", "agricoltura")
            .expect("group exists");
        assert_eq!(catalog.dataset_groups("ds"), vec!["agricoltura"]);
        catalog.clear_dataset_groups("ds");
        assert!(catalog.dataset_groups("ds").is_empty());
    }
}
