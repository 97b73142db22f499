//! Mint caller tokens accepted by kube-auth-gateway.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use kube_auth_gateway::auth::keys::load_secret;
use kube_auth_gateway::auth::{MethodList, TokenClaims};
use kube_auth_gateway::config::loader::read_file;

#[derive(Parser)]
#[command(name = "gate-token", version)]
#[command(about = "Mint a signed token for kube-auth-gateway", long_about = None)]
struct Cli {
    #[command(flatten)]
    key: KeySource,

    /// Allowed HTTP methods, comma separated (e.g. "GET,LIST").
    #[arg(long)]
    methods: Option<String>,

    /// Allowed path prefix, matched against the full request path.
    #[arg(long)]
    path: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    audience: Option<String>,

    /// Lifetime in seconds. Omit for a token without expiry.
    #[arg(long)]
    ttl_secs: Option<u64>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct KeySource {
    /// HMAC secret file; signs with HS256.
    #[arg(long)]
    secret_file: Option<PathBuf>,

    /// RSA private key (PEM); signs with RS256.
    #[arg(long)]
    private_key: Option<PathBuf>,
}

#[derive(Serialize)]
struct MintedClaims {
    #[serde(flatten)]
    claims: TokenClaims,

    #[serde(skip_serializing_if = "Option::is_none")]
    aud: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let claims = MintedClaims {
        claims: TokenClaims {
            sub: cli.subject,
            iat: Some(now),
            exp: cli.ttl_secs.map(|ttl| now + ttl),
            nbf: None,
            allowed_methods: cli.methods.map(MethodList::Csv),
            allowed_path: cli.path,
        },
        aud: cli.audience,
    };

    let (algorithm, key) = match (cli.key.secret_file, cli.key.private_key) {
        (Some(path), _) => (Algorithm::HS256, EncodingKey::from_secret(&load_secret(&path)?)),
        (None, Some(path)) => (Algorithm::RS256, EncodingKey::from_rsa_pem(&read_file(&path)?)?),
        (None, None) => return Err("one of --secret-file or --private-key is required".into()),
    };

    println!("{}", encode(&Header::new(algorithm), &claims, &key)?);
    Ok(())
}
