pub mod actions;
pub mod admin;
pub mod identity;
pub mod loader;
pub mod permission;
pub mod users;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{LookupCache, NullCache};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::CoreError;
use crate::models::{SchemaRegistry, TableInfo, TableRelation};
use crate::query::Dialect;

pub const USER_ACCOUNT_TABLE: &str = "user_account";
pub const USER_ACCOUNT_ID_COLUMN: &str = "user_account_id";
pub const USERGROUP_TABLE: &str = "usergroup";
pub const ADMINISTRATORS_GROUP: &str = "administrators";
pub const WORLD_TABLE: &str = "world";

pub fn user_group_join_table() -> String {
    TableRelation::usergroup_membership(USER_ACCOUNT_TABLE).join_table_name()
}

/// Types outside the registry whose rows are readable by anyone: pseudo rows
/// tagged `none` and file attachments tagged `file.<mime>`.
pub fn is_guest_only_type(type_name: &str) -> bool {
    type_name == "none" || type_name.starts_with("file.")
}

/// The caller-supplied request to embed related rows. Names are relation
/// column names, related type names, or `*` for everything.
#[derive(Debug, Clone, Default)]
pub struct IncludeSet {
    names: HashSet<String>,
}

impl IncludeSet {
    pub fn none() -> IncludeSet {
        IncludeSet::default()
    }

    pub fn all() -> IncludeSet {
        IncludeSet::of(&["*"])
    }

    pub fn of(names: &[&str]) -> IncludeSet {
        IncludeSet {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn requests(&self, name: &str) -> bool {
        self.names.contains(name) || self.names.contains("*")
    }

    /// True when any of the given names is requested.
    pub fn requests_any<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|name| self.requests(name))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Local sync folder backing one file column.
#[derive(Debug, Clone)]
pub struct AssetFolder {
    pub local_sync_path: PathBuf,
}

/// The data-access and authorization core. Holds the connection pool, the
/// immutable schema registry, and the injected lookup cache; every operation
/// additionally takes the executor handle (a pooled connection or a
/// transaction) it should run on.
pub struct DataResource {
    pool: DbPool,
    registry: SchemaRegistry,
    cache: Arc<dyn LookupCache>,
    dialect: Dialect,
    include_fanout: u32,
    include_depth: u32,
    asset_folders: HashMap<String, HashMap<String, AssetFolder>>,
}

impl DataResource {
    pub fn new(pool: DbPool, registry: SchemaRegistry) -> DataResource {
        DataResource {
            pool,
            registry,
            cache: Arc::new(NullCache),
            dialect: Dialect::default(),
            include_fanout: 50,
            include_depth: 1,
            asset_folders: HashMap::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn LookupCache>) -> DataResource {
        self.cache = cache;
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> DataResource {
        self.dialect = dialect;
        self
    }

    pub fn with_config(mut self, config: &AppConfig) -> DataResource {
        self.include_fanout = config.include_fanout;
        self.include_depth = config.include_depth;
        self
    }

    pub fn with_asset_folder(
        mut self,
        table_name: &str,
        column_name: &str,
        local_sync_path: PathBuf,
    ) -> DataResource {
        self.asset_folders
            .entry(table_name.to_string())
            .or_default()
            .insert(column_name.to_string(), AssetFolder { local_sync_path });
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) fn cache(&self) -> &Arc<dyn LookupCache> {
        &self.cache
    }

    pub(crate) fn include_fanout(&self) -> u32 {
        self.include_fanout
    }

    pub(crate) fn include_depth(&self) -> u32 {
        self.include_depth
    }

    pub(crate) fn asset_folder(&self, table_name: &str, column_name: &str) -> Option<&AssetFolder> {
        self.asset_folders
            .get(table_name)
            .and_then(|columns| columns.get(column_name))
    }

    pub(crate) fn table_info(&self, type_name: &str) -> Result<&TableInfo, CoreError> {
        self.registry
            .get(type_name)
            .ok_or_else(|| CoreError::BadRequest(format!("unknown type [{}]", type_name)))
    }

    /// Join-table rows resolve no groups; the flag on the descriptor decides,
    /// the name shape is only the fallback for unregistered types.
    pub(crate) fn is_join_table_type(&self, type_name: &str) -> bool {
        match self.registry.get(type_name) {
            Some(table) => table.is_join_table,
            None => type_name.contains("_has_"),
        }
    }
}
