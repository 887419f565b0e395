//! Print the CustomResourceDefinitions served by the operator as YAML
//!
//! ```bash
//! crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use influxdb_operator::crd::{Bucket, Config, Organization, Token};
use kube::CustomResourceExt;

fn main() -> Result<()> {
    let documents = [
        serde_yaml::to_string(&Bucket::crd())?,
        serde_yaml::to_string(&Config::crd())?,
        serde_yaml::to_string(&Organization::crd())?,
        serde_yaml::to_string(&Token::crd())?,
    ];
    print!("{}", documents.join("---\n"));
    Ok(())
}
