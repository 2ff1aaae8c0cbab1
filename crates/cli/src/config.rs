//! Configuration and cluster access for the CLI

use anyhow::{Context, Result};
use nanny_lib::NannyConfig;
use std::path::Path;

/// Load the nanny configuration the same way the nanny itself does
pub fn load_nanny_config(path: Option<&Path>) -> Result<NannyConfig> {
    NannyConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })
}

/// Build a Kubernetes client from an explicit kubeconfig or the default chain
pub async fn kube_client(kubeconfig: Option<&Path>) -> Result<kube::Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = kube::config::Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &kube::config::KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig")?
        }
        None => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    kube::Client::try_from(config).context("Failed to create Kubernetes client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_nanny_config_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "deployment: kube-dns\nnamespace: kube-system\nresources:\n  - name: cpu\n    base: 100m\n    extra_per_node: 1m\n"
        )
        .unwrap();

        let config = load_nanny_config(Some(file.path())).unwrap();
        assert_eq!(config.deployment, "kube-dns");
        assert_eq!(config.resources[0].extra_per_node, "1m");
    }

    #[test]
    fn test_load_nanny_config_missing_file() {
        let result = load_nanny_config(Some(Path::new("/nonexistent/nanny.toml")));
        assert!(result.is_err());
    }
}
