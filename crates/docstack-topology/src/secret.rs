//! Secret provisioner
//!
//! Declares the database credential record and exposes it two ways: by
//! dynamic reference to the data store, and as the secure parameter ARN the
//! task injects at container start.

use crate::error::Result;
use crate::naming::ResolvedNames;
use docstack_cloud::{Deferred, Expr, Pseudo, Resource, ResourceGraph};
use serde_json::json;

pub const USER_ID: &str = "User";
pub const ACCESS_KEY_ID: &str = "AccessKey";
pub const SECRET_ID: &str = "RdsSecret";

/// The credential record shared by the data store and the task
#[derive(Debug, Clone)]
pub struct CredentialSecret {
    /// Logical id of the secret resource
    pub logical_id: String,
    pub username: String,
    pub database_name: String,
    /// Generated credential, only known after provisioning
    pub password: Deferred,
    /// Secure parameter the task reads `DB_PASS` from
    pub parameter_path: String,
    pub parameter_arn: Expr,
}

impl CredentialSecret {
    /// Dynamic reference to one field of the secret value
    pub fn field_reference(&self, field: &str) -> Expr {
        Expr::join([
            "{{resolve:secretsmanager:".into(),
            Expr::reference(&self.logical_id),
            format!(":SecretString:{}::}}}}", field).into(),
        ])
    }
}

/// Declares the user, its access key and the credential secret
pub fn provision(graph: &mut ResourceGraph, names: &ResolvedNames) -> Result<CredentialSecret> {
    graph.add(Resource::new(USER_ID, "AWS::IAM::User").taggable())?;
    graph.add(
        Resource::new(ACCESS_KEY_ID, "AWS::IAM::AccessKey")
            .with_property("UserName", Expr::reference(USER_ID)),
    )?;

    let password = Deferred::new(ACCESS_KEY_ID, "SecretAccessKey");

    // {"username":"...","database":"...","password":"<deferred>"}
    let prefix = format!(
        "{{\"username\":{},\"database\":{},\"password\":\"",
        json!(names.database_username),
        json!(names.database_name)
    );
    let secret_string = Expr::join([prefix.into(), password.clone().into(), "\"}".into()]);

    graph.add(
        Resource::new(SECRET_ID, "AWS::SecretsManager::Secret")
            .with_property("SecretString", secret_string)
            .taggable(),
    )?;

    let parameter_arn = Expr::join([
        "arn:".into(),
        Pseudo::Partition.into(),
        ":ssm:".into(),
        Pseudo::Region.into(),
        ":".into(),
        Pseudo::AccountId.into(),
        format!(":parameter{}", names.secret_parameter_path).into(),
    ]);

    tracing::debug!(parameter = %names.secret_parameter_path, "Provisioned credential secret");

    Ok(CredentialSecret {
        logical_id: SECRET_ID.to_string(),
        username: names.database_username.clone(),
        database_name: names.database_name.clone(),
        password,
        parameter_path: names.secret_parameter_path.clone(),
        parameter_arn,
    })
}
