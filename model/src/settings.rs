use crate::errors::{GraphError, GraphResult};
use crate::schema::settings;
use chunkedgraph_database::prelude::{ReadRequest, RowMutation, Store};
use chunkedgraph_ids::{Meta, MetaConfig};

/// Opens a graph against `store`, validating `config` against whatever
/// `GraphSettings` row is already persisted there (creating it on first
/// use), mirroring the teacher's pattern of comparing incoming parameters to
/// a persisted config row rather than trusting the caller blindly.
///
/// `Meta` itself has no `Store` dependency (it lives below `database` in the
/// crate graph), so the open/validate step lives here instead of on `Meta`.
pub fn open_or_create(store: &dyn Store, config: MetaConfig) -> GraphResult<Meta> {
    let meta = Meta::from_config(config.clone())?;

    let row_key = settings::row_key();
    let existing = store.read_rows(ReadRequest::keys(vec![row_key.clone()]).with_columns(vec![settings::config()]))?;

    match existing.get(&row_key).and_then(|cells| cells.get(&settings::config())).and_then(|gens| gens.first()) {
        Some(cell) => {
            let persisted: MetaConfig = bincode::deserialize(&cell.value).map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;
            if persisted != config {
                return Err(GraphError::BadRequest(format!("GraphSettings mismatch: persisted {persisted:?} != requested {config:?}")));
            }
        }
        None => {
            let bytes = bincode::serialize(&config).map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;
            store.write_block(&[RowMutation::new(row_key).set(settings::config(), bytes)])?;
        }
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::MemoryStore;

    fn config() -> MetaConfig {
        Meta::default_example().config().clone()
    }

    #[test]
    fn first_open_persists_config() {
        let store = MemoryStore::new();
        let meta = open_or_create(&store, config()).unwrap();
        assert_eq!(meta.fanout(), 2);
    }

    #[test]
    fn second_open_with_same_config_succeeds() {
        let store = MemoryStore::new();
        open_or_create(&store, config()).unwrap();
        assert!(open_or_create(&store, config()).is_ok());
    }

    #[test]
    fn second_open_with_different_config_fails() {
        let store = MemoryStore::new();
        open_or_create(&store, config()).unwrap();
        let mut other = config();
        other.fanout = 4;
        assert!(matches!(open_or_create(&store, other), Err(GraphError::BadRequest(_))));
    }

    #[test]
    fn rejects_skip_connections() {
        let store = MemoryStore::new();
        let mut bad = config();
        bad.use_skip_connections = true;
        assert!(open_or_create(&store, bad).is_err());
    }
}
