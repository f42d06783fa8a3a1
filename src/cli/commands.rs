//! CLI command implementations
//!
//! Every command follows the same boot sequence before doing its work:
//!
//! 1. Load and validate configuration, set the log level
//! 2. Open the configured document store
//! 3. `ensure_schema_applied` (FATAL on failure: no command runs against
//!    a store whose schema could not be applied)
//!
//! Each command returns one JSON value, written to stdout by `run`.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::{IdentityProvider, LocalIdentityProvider};
use crate::catalog::{AccountProfile, AccountService, ProductCatalog};
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::schema::{DocumentValidator, SchemaInitializer, SchemaRegistry};
use crate::store::{document_from_json, document_to_json, DocumentStore, FileStore, MemoryStore};

use super::args::{Cli, Command};
use super::config::{Config, StoreKind};
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_response};

/// Main CLI entry point
///
/// Parses arguments, runs the command and writes its response.
/// This is the only function that main.rs should call.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let data = run_command(&cli.config, cli.command).await?;
    write_response(data)
}

/// Boot against the configured store and run one command
pub async fn run_command(config_path: &Path, command: Command) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity());
    log_event(Event::BootStart);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("path", &config_path.display().to_string()),
            ("store", config.store.as_str()),
        ],
    );

    match config.store {
        StoreKind::Memory => {
            log_event_with_fields(Event::StoreOpened, &[("store", "memory")]);
            execute(Arc::new(MemoryStore::new()), &config, command).await
        }
        StoreKind::File => {
            let data_dir = config
                .data_path()
                .ok_or_else(|| CliError::config_error("data_dir is required when store is 'file'"))?;
            let store = FileStore::open(data_dir).map_err(|e| boot_failure(e.to_string()))?;
            log_event_with_fields(
                Event::StoreOpened,
                &[
                    ("journal", &store.journal_path().display().to_string()),
                    ("store", "file"),
                ],
            );
            execute(Arc::new(store), &config, command).await
        }
    }
}

async fn execute<S: DocumentStore>(
    store: Arc<S>,
    config: &Config,
    command: Command,
) -> CliResult<Value> {
    let registry = Arc::new(SchemaRegistry::storefront());
    let applied = boot(&registry, &store).await?;

    match command {
        Command::Init => Ok(json!({
            "applied": applied,
            "version": registry.version(),
        })),
        Command::Schema => schema(&registry, store).await,
        Command::Validate { collection, file } => {
            validate(store, &collection, file.as_deref()).await
        }
        Command::CreateAccount {
            email,
            password,
            file,
        } => create_account(store, config, &email, &password, file.as_deref()).await,
        Command::SignIn { email, password } => {
            let identity = LocalIdentityProvider::new(store, config.password_policy());
            let user = identity.sign_in(&email, &password).await?;
            Ok(serde_json::to_value(user)?)
        }
        Command::CreateProduct {
            file,
            email,
            password,
        } => {
            let credentials = email.zip(password);
            create_product(store, config, file.as_deref(), credentials).await
        }
        Command::ListProducts => list_products(store).await,
    }
}

/// Apply the schema. Returns whether anything was written.
async fn boot<S: DocumentStore>(registry: &Arc<SchemaRegistry>, store: &Arc<S>) -> CliResult<bool> {
    let applied = SchemaInitializer::new(Arc::clone(registry), Arc::clone(store))
        .ensure_schema_applied()
        .await
        .map_err(|e| boot_failure(e.to_string()))?;

    log_event_with_fields(Event::BootComplete, &[("schema_written", &applied.to_string())]);
    Ok(applied)
}

fn boot_failure(reason: String) -> CliError {
    log_event_with_fields(Event::BootFailed, &[("error", &reason)]);
    CliError::boot_failed(reason)
}

/// Declared version, persisted version and every persisted collection config
async fn schema<S: DocumentStore>(registry: &Arc<SchemaRegistry>, store: Arc<S>) -> CliResult<Value> {
    let persisted = SchemaInitializer::new(Arc::clone(registry), Arc::clone(&store))
        .persisted_version()
        .await?;
    let validator = DocumentValidator::new(store);

    let mut collections = serde_json::Map::new();
    for name in registry.collection_names() {
        let config = validator.get_collection_config(name).await?;
        collections.insert(name.to_string(), config.to_value().to_json());
    }

    Ok(json!({
        "declared_version": registry.version(),
        "persisted_version": persisted,
        "collections": collections,
    }))
}

async fn validate<S: DocumentStore>(
    store: Arc<S>,
    collection: &str,
    file: Option<&Path>,
) -> CliResult<Value> {
    let record = document_from_json(read_input(file)?)
        .ok_or_else(|| CliError::io_error("Record must be a JSON object"))?;

    let valid = DocumentValidator::new(store)
        .validate(collection, &record)
        .await?;
    Ok(json!({ "collection": collection, "valid": valid }))
}

async fn create_account<S: DocumentStore>(
    store: Arc<S>,
    config: &Config,
    email: &str,
    password: &str,
    file: Option<&Path>,
) -> CliResult<Value> {
    let profile: AccountProfile = serde_json::from_value(read_input(file)?)?;
    let identity = Arc::new(LocalIdentityProvider::new(
        Arc::clone(&store),
        config.password_policy(),
    ));

    let user = AccountService::new(store, identity)
        .create_account_with_profile(email, password, &profile)
        .await?;
    Ok(serde_json::to_value(user)?)
}

/// Products are validated from the raw JSON record so every violation is
/// reported at once.
async fn create_product<S: DocumentStore>(
    store: Arc<S>,
    config: &Config,
    file: Option<&Path>,
    credentials: Option<(String, String)>,
) -> CliResult<Value> {
    let record = document_from_json(read_input(file)?)
        .ok_or_else(|| CliError::io_error("Product must be a JSON object"))?;

    let actor = match credentials {
        Some((email, password)) => {
            let identity = LocalIdentityProvider::new(Arc::clone(&store), config.password_policy());
            Some(identity.sign_in(&email, &password).await?)
        }
        None => None,
    };

    let mut catalog = ProductCatalog::new(store);
    if let Some(admin) = &config.admin_email {
        catalog = catalog.with_admin_email(admin.as_str());
    }

    let id = catalog.create_product_record_as(actor.as_ref(), record).await?;
    Ok(json!({ "id": id }))
}

async fn list_products<S: DocumentStore>(store: Arc<S>) -> CliResult<Value> {
    let products = ProductCatalog::new(store).list_products().await?;
    Ok(Value::Array(
        products
            .iter()
            .map(|(id, doc)| json!({ "id": id, "fields": document_to_json(doc) }))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir, extra: Value) -> PathBuf {
        let config_path = temp_dir.path().join("storefront.json");
        let mut config = json!({
            "data_dir": temp_dir.path().join("data").to_string_lossy(),
        });
        if let (Some(base), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn write_input(temp_dir: &TempDir, name: &str, value: Value) -> PathBuf {
        let path = temp_dir.path().join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn shirt() -> Value {
        json!({"name": "Shirt", "description": "Cotton", "price": 20, "quantity": 3, "status": true})
    }

    #[tokio::test]
    async fn test_init_applies_once() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({}));

        let first = run_command(&config_path, Command::Init).await.unwrap();
        assert_eq!(first["applied"], true);
        assert_eq!(first["version"], 2);

        let second = run_command(&config_path, Command::Init).await.unwrap();
        assert_eq!(second["applied"], false);
    }

    #[tokio::test]
    async fn test_schema_reports_persisted_configs() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({"store": "memory"}));

        let out = run_command(&config_path, Command::Schema).await.unwrap();
        assert_eq!(out["persisted_version"], 2);
        assert_eq!(out["collections"]["users"]["fields"][0]["name"], "first_name");
        assert_eq!(out["collections"]["products"]["fields"][2]["type"], "number");
    }

    #[tokio::test]
    async fn test_validate_reports_violations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({"store": "memory"}));
        let file = write_input(&temp_dir, "p.json", json!({"name": "Hat", "price": "cheap"}));

        let err = run_command(
            &config_path,
            Command::Validate {
                collection: "products".into(),
                file: Some(file),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), &CliErrorCode::Rejected("SCHEMA_VALIDATION_FAILED"));
        assert!(err.message().contains("field description is required"));
        assert!(err.message().contains("field price must be of type number"));
    }

    #[tokio::test]
    async fn test_create_product_reports_all_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({"store": "memory"}));
        let file = write_input(&temp_dir, "hat.json", json!({"name": "Hat"}));

        let err = run_command(
            &config_path,
            Command::CreateProduct {
                file: Some(file),
                email: None,
                password: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), &CliErrorCode::Rejected("SCHEMA_VALIDATION_FAILED"));
        assert_eq!(
            err.message(),
            "field description is required\n\
             field price is required\n\
             field quantity is required\n\
             field status is required"
        );
    }

    #[tokio::test]
    async fn test_products_persist_across_runs() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({}));
        let file = write_input(&temp_dir, "shirt.json", shirt());

        let created = run_command(
            &config_path,
            Command::CreateProduct {
                file: Some(file),
                email: None,
                password: None,
            },
        )
        .await
        .unwrap();

        let listed = run_command(&config_path, Command::ListProducts).await.unwrap();
        assert_eq!(listed[0]["id"], created["id"]);
        assert_eq!(listed[0]["fields"]["name"], "Shirt");
    }

    #[tokio::test]
    async fn test_admin_gate_and_sign_in() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({"admin_email": "admin@shop.com"}));
        let profile = write_input(&temp_dir, "profile.json", json!({"first_name": "Ada", "last_name": "Admin"}));
        let product = write_input(&temp_dir, "shirt.json", shirt());

        let user = run_command(
            &config_path,
            Command::CreateAccount {
                email: "admin@shop.com".into(),
                password: "secret1".into(),
                file: Some(profile),
            },
        )
        .await
        .unwrap();

        let signed_in = run_command(
            &config_path,
            Command::SignIn {
                email: "admin@shop.com".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(signed_in["uid"], user["uid"]);

        let refused = run_command(
            &config_path,
            Command::CreateProduct {
                file: Some(product.clone()),
                email: None,
                password: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(refused.code_str(), "CATALOG_NOT_ADMIN");

        assert!(run_command(
            &config_path,
            Command::CreateProduct {
                file: Some(product),
                email: Some("admin@shop.com".into()),
                password: Some("secret1".into()),
            },
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_journal_fails_boot() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir, json!({}));
        run_command(&config_path, Command::Init).await.unwrap();
        run_command(
            &config_path,
            Command::CreateProduct {
                file: Some(write_input(&temp_dir, "shirt.json", shirt())),
                email: None,
                password: None,
            },
        )
        .await
        .unwrap();

        let journal = temp_dir.path().join("data").join("data").join("documents.journal");
        let mut bytes = fs::read(&journal).unwrap();
        bytes[8] ^= 0xff;
        fs::write(&journal, bytes).unwrap();

        let err = run_command(&config_path, Command::Init).await.unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::BootFailed);
    }
}
