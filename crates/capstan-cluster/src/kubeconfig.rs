//! Kubeconfig rendering.
//!
//! The document is a typed struct serialized with serde_json — kubectl
//! reads JSON kubeconfigs (YAML superset), so no YAML emitter is needed
//! and no string templating touches the credential material.

use serde::Serialize;

use crate::ClusterInfo;

#[derive(Serialize)]
struct Kubeconfig {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: String,
    users: Vec<NamedUser>,
}

#[derive(Serialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Serialize)]
struct ClusterEntry {
    server: String,
    #[serde(rename = "certificate-authority-data")]
    certificate_authority_data: String,
}

#[derive(Serialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Serialize)]
struct UserEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    exec: Option<ExecEntry>,
}

#[derive(Serialize)]
struct ExecEntry {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    command: String,
    args: Vec<String>,
}

/// Render a kubeconfig for one cluster.
///
/// `credential_command` feeds the exec credential plugin (program then
/// args); empty leaves the user entry bare.
pub fn render(
    cluster_name: &str,
    info: &ClusterInfo,
    credential_command: &[String],
) -> Result<String, serde_json::Error> {
    let exec = credential_command.split_first().map(|(command, args)| ExecEntry {
        api_version: "client.authentication.k8s.io/v1beta1",
        command: command.clone(),
        args: args.to_vec(),
    });

    let config = Kubeconfig {
        api_version: "v1",
        kind: "Config",
        clusters: vec![NamedCluster {
            name: cluster_name.to_string(),
            cluster: ClusterEntry {
                server: info.endpoint.clone(),
                certificate_authority_data: info.ca_certificate.clone(),
            },
        }],
        contexts: vec![NamedContext {
            name: cluster_name.to_string(),
            context: ContextEntry {
                cluster: cluster_name.to_string(),
                user: cluster_name.to_string(),
            },
        }],
        current_context: cluster_name.to_string(),
        users: vec![NamedUser {
            name: cluster_name.to_string(),
            user: UserEntry { exec },
        }],
    };

    serde_json::to_string_pretty(&config)
}
