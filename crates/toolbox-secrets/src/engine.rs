//! Idempotent secret provisioning.
//!
//! Entries are processed strictly one after another: a secret that already
//! exists is left untouched, anything missing is generated and written.
//! The first failure stops the run; earlier writes stay in place.

use std::sync::Arc;
use toolbox_types::{
    Generator, KeyAlgorithm, Prompt, PromptOrder, Result, SecretKind, SecretPath, SecretRecord,
    SecretSpec, SecretStore, ToolboxError,
};
use tracing::{debug, info, warn};

use crate::types::{canonical_fields, create_generator};

/// Paths touched by one provisioning run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Secrets that were generated and written
    pub generated: Vec<String>,
    /// Secrets that already existed
    pub skipped: Vec<String>,
}

enum Outcome {
    Generated,
    Skipped,
}

/// Walks a specification list against a secret store.
pub struct SecretEngine {
    store: Arc<dyn SecretStore>,
    prompt: Arc<dyn Prompt>,
    order: PromptOrder,
}

impl SecretEngine {
    /// Create an engine processing entries in specification order.
    pub fn new(store: Arc<dyn SecretStore>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            store,
            prompt,
            order: PromptOrder::default(),
        }
    }

    /// Change when `manual` entries are processed.
    pub fn with_order(mut self, order: PromptOrder) -> Self {
        self.order = order;
        self
    }

    /// Ensure every entry of `specs` exists in the store.
    ///
    /// Errors are wrapped in [`ToolboxError::Secret`] naming the entry.
    pub async fn process_all(&self, specs: &[SecretSpec]) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for spec in ordered(specs, self.order) {
            match self
                .process(spec)
                .await
                .map_err(|e| ToolboxError::for_secret(&spec.path, e))?
            {
                Outcome::Generated => report.generated.push(spec.path.clone()),
                Outcome::Skipped => report.skipped.push(spec.path.clone()),
            }
        }

        info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            "provisioning finished"
        );
        Ok(report)
    }

    async fn process(&self, spec: &SecretSpec) -> Result<Outcome> {
        let path = SecretPath::parse(&spec.path)?;

        if let Some(existing) = self.store.read(&path).await? {
            if let Ok(kind) = spec.kind.parse::<SecretKind>() {
                let missing: Vec<&str> = canonical_fields(kind)
                    .iter()
                    .copied()
                    .filter(|field| !existing.contains_key(*field))
                    .collect();
                if !missing.is_empty() {
                    warn!(
                        path = %path,
                        missing = ?missing,
                        "existing secret lacks expected fields, leaving it unchanged"
                    );
                }
            }
            info!(path = %path, "secret exists, skipping");
            return Ok(Outcome::Skipped);
        }

        let generator = create_generator(spec, &path, Arc::clone(&self.prompt))?;
        let kind = generator.kind();
        debug!(path = %path, %kind, "generating secret");
        let record = generate_blocking(generator).await?;
        self.store.write(&path, &record).await?;
        info!(path = %path, %kind, "secret created");
        Ok(Outcome::Generated)
    }
}

/// Key generation and operator prompts block; keep them off the runtime
/// threads that drive the tunnel.
async fn generate_blocking(generator: Box<dyn Generator>) -> Result<SecretRecord> {
    tokio::task::spawn_blocking(move || generator.generate())
        .await
        .map_err(|e| ToolboxError::Generation(format!("generator task failed: {}", e)))?
}

/// Entries in the order `order` processes them.
fn ordered(specs: &[SecretSpec], order: PromptOrder) -> Vec<&SecretSpec> {
    let is_manual = |spec: &SecretSpec| {
        spec.kind
            .parse::<SecretKind>()
            .map(|kind| kind.is_interactive())
            .unwrap_or(false)
    };

    match order {
        PromptOrder::InOrder => specs.iter().collect(),
        PromptOrder::DeferManual => specs
            .iter()
            .filter(|spec| !is_manual(*spec))
            .chain(specs.iter().filter(|spec| is_manual(*spec)))
            .collect(),
    }
}

/// Check every entry's path, type and parameters without touching the store.
pub fn validate_specs(specs: &[SecretSpec]) -> Result<()> {
    for spec in specs {
        validate_spec(spec).map_err(|e| ToolboxError::for_secret(&spec.path, e))?;
    }
    Ok(())
}

fn validate_spec(spec: &SecretSpec) -> Result<()> {
    SecretPath::parse(&spec.path)?;
    if spec.kind.parse::<SecretKind>()? == SecretKind::Ssh {
        if let Some(algorithm) = &spec.algorithm {
            algorithm.parse::<KeyAlgorithm>()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<String, SecretRecord>>,
        writes: Mutex<Vec<String>>,
        fail_reads: bool,
    }

    impl MemoryStore {
        fn with(path: &str, record: &[(&str, &str)]) -> Self {
            let store = Self::default();
            store.records.lock().unwrap().insert(
                path.to_string(),
                record
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            store
        }

        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SecretStore for MemoryStore {
        async fn read(&self, path: &SecretPath) -> Result<Option<SecretRecord>> {
            if self.fail_reads {
                return Err(ToolboxError::Vault("connection reset".to_string()));
            }
            Ok(self.records.lock().unwrap().get(&path.to_string()).cloned())
        }

        async fn write(&self, path: &SecretPath, data: &SecretRecord) -> Result<()> {
            self.writes.lock().unwrap().push(path.to_string());
            self.records
                .lock()
                .unwrap()
                .insert(path.to_string(), data.clone());
            Ok(())
        }
    }

    struct FixedPrompt(&'static str);

    impl Prompt for FixedPrompt {
        fn secret(&self, _message: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn engine(store: &Arc<MemoryStore>, answer: &'static str) -> SecretEngine {
        SecretEngine::new(store.clone(), Arc::new(FixedPrompt(answer)))
    }

    fn spec(path: &str, kind: &str) -> SecretSpec {
        SecretSpec::new(path, kind)
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let specs = vec![
            spec("secret/gitea/admin", "random"),
            spec("secret/gitea/deploy-key", "ssh"),
            spec("secret/smtp/password", "manual"),
        ];

        let first = engine(&store, "hunter2").process_all(&specs).await.unwrap();
        assert_eq!(first.generated.len(), 3);
        assert_eq!(store.writes().len(), 3);

        let second = engine(&store, "hunter2").process_all(&specs).await.unwrap();
        assert!(second.generated.is_empty());
        assert_eq!(second.skipped.len(), 3);
        assert_eq!(store.writes().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_type_stops_run() {
        let store = Arc::new(MemoryStore::default());
        let specs = vec![
            spec("secret/a", "random"),
            spec("secret/b", "quantum"),
            spec("secret/c", "random"),
        ];

        let err = engine(&store, "x").process_all(&specs).await.unwrap_err();
        match &err {
            ToolboxError::Secret { path, .. } => assert_eq!(path, "secret/b"),
            other => panic!("expected Secret, got {:?}", other),
        }
        assert!(matches!(err.root(), ToolboxError::Unsupported { .. }));
        assert_eq!(store.writes(), vec!["secret/a"]);
    }

    #[tokio::test]
    async fn test_existing_record_is_never_overwritten() {
        let store = Arc::new(MemoryStore::with("secret/app/db", &[("password", "legacy")]));
        let report = engine(&store, "x")
            .process_all(&[spec("secret/app/db", "random")])
            .await
            .unwrap();

        assert_eq!(report.skipped, vec!["secret/app/db"]);
        assert!(store.writes().is_empty());
        let records = store.records.lock().unwrap();
        assert_eq!(records["secret/app/db"]["password"], "legacy");
    }

    #[tokio::test]
    async fn test_generated_record_uses_canonical_fields() {
        let store = Arc::new(MemoryStore::default());
        engine(&store, "x")
            .process_all(&[spec("kv/node/ssh", "ssh"), spec("kv/app/token", "random")])
            .await
            .unwrap();

        let records = store.records.lock().unwrap();
        let ssh = &records["kv/node/ssh"];
        assert!(ssh.contains_key("private_key"));
        assert!(ssh["public_key"].starts_with("ssh-ed25519 "));
        assert_eq!(records["kv/app/token"]["value"].len(), 32);
    }

    #[tokio::test]
    async fn test_zero_length_random_uses_default() {
        let store = Arc::new(MemoryStore::default());
        let mut zero = spec("secret/app/session", "random");
        zero.length = Some(0);
        engine(&store, "x").process_all(&[zero]).await.unwrap();

        let records = store.records.lock().unwrap();
        assert_eq!(records["secret/app/session"]["value"].len(), 32);
    }

    #[tokio::test]
    async fn test_prompt_order_policies() {
        let specs = vec![
            spec("secret/m1", "manual"),
            spec("secret/r1", "random"),
            spec("secret/m2", "manual"),
            spec("secret/r2", "random"),
        ];

        let store = Arc::new(MemoryStore::default());
        engine(&store, "v").process_all(&specs).await.unwrap();
        assert_eq!(
            store.writes(),
            vec!["secret/m1", "secret/r1", "secret/m2", "secret/r2"]
        );

        let store = Arc::new(MemoryStore::default());
        engine(&store, "v")
            .with_order(PromptOrder::DeferManual)
            .process_all(&specs)
            .await
            .unwrap();
        assert_eq!(
            store.writes(),
            vec!["secret/r1", "secret/r2", "secret/m1", "secret/m2"]
        );
    }

    struct ThreadPrompt(Mutex<Option<std::thread::ThreadId>>);

    impl Prompt for ThreadPrompt {
        fn secret(&self, _message: &str) -> Result<String> {
            *self.0.lock().unwrap() = Some(std::thread::current().id());
            Ok("typed".to_string())
        }
    }

    #[tokio::test]
    async fn test_prompt_runs_off_the_runtime_thread() {
        let store = Arc::new(MemoryStore::default());
        let prompt = Arc::new(ThreadPrompt(Mutex::new(None)));
        SecretEngine::new(store.clone(), prompt.clone())
            .process_all(&[spec("secret/smtp/password", "manual")])
            .await
            .unwrap();

        let prompted_on = prompt.0.lock().unwrap().unwrap();
        assert_ne!(prompted_on, std::thread::current().id());
        assert_eq!(store.records.lock().unwrap()["secret/smtp/password"]["value"], "typed");
    }

    #[tokio::test]
    async fn test_empty_manual_input_aborts() {
        let store = Arc::new(MemoryStore::default());
        let err = engine(&store, "")
            .process_all(&[spec("secret/smtp", "manual"), spec("secret/next", "random")])
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ToolboxError::EmptyInput(p) if p == "secret/smtp"));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_aborts() {
        let store = Arc::new(MemoryStore {
            fail_reads: true,
            ..Default::default()
        });
        let err = engine(&store, "x")
            .process_all(&[spec("secret/a", "random")])
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ToolboxError::Vault(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_path_aborts() {
        let store = Arc::new(MemoryStore::default());
        let err = engine(&store, "x")
            .process_all(&[spec("nomount", "random")])
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ToolboxError::MalformedPath(_)));
    }

    #[test]
    fn test_validate_specs() {
        assert!(validate_specs(&[spec("secret/a", "random"), spec("secret/b", "ssh")]).is_ok());

        let mut bad_algorithm = spec("secret/key", "ssh");
        bad_algorithm.algorithm = Some("dsa".to_string());
        let err = validate_specs(&[spec("secret/a", "random"), bad_algorithm]).unwrap_err();
        assert!(err.to_string().contains("secret/key"));

        let mut zero = spec("secret/z", "random");
        zero.length = Some(0);
        assert!(validate_specs(&[zero]).is_ok());

        assert!(matches!(
            validate_specs(&[spec("/b", "random")]).unwrap_err().root(),
            ToolboxError::MalformedPath(_)
        ));
    }
}
