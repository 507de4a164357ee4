use std::{path::PathBuf, process::ExitCode};

use aclgate::{
    acl::{AccessRequest, ActionSet, Resolution, parse_candidates},
    authn::{AuthenticatorChain, AuthnDecision, Password, hash_password},
    authz::AuthorizerChain,
    config::AclGateConfig,
    observability::init_tracing,
};
use clap::Parser;
use serde::Serialize;
use tokio::io::AsyncBufReadExt;

/// Environment variable checked for a password before prompting on stdin.
const PASSWORD_ENV: &str = "ACLGATE_PASSWORD";

/// CLI arguments for aclgate
#[derive(Parser, Debug)]
#[command(version, about = "Registry ACL resolution and credential checks", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file. Without one, no backends are configured.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct RequestArgs {
    /// Principal whose rules are consulted
    #[arg(short, long)]
    principal: String,
    /// Resource type, e.g. `repository`
    #[arg(short = 't', long = "type")]
    resource_type: String,
    /// Resource name, e.g. `library/centos`
    #[arg(short, long = "name")]
    resource_name: String,
    /// Comma-separated requested actions, e.g. `pull,push`
    #[arg(short, long, default_value = "")]
    actions: String,
}

impl RequestArgs {
    fn into_request(self) -> Result<AccessRequest, String> {
        let actions = if self.actions.is_empty() {
            ActionSet::new()
        } else {
            ActionSet::parse_csv(&self.actions)
                .ok_or_else(|| format!("empty action in '{}'", self.actions))?
        };
        Ok(
            AccessRequest::new(self.principal, self.resource_type, self.resource_name)
                .with_action_set(actions),
        )
    }
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Resolve a request against the configured authorizers
    Authorize(RequestArgs),
    /// Show how each rule was evaluated for a request
    Explain(RequestArgs),
    /// Check a password against the configured authenticators
    Authenticate {
        #[arg(short, long)]
        principal: String,
    },
    /// Parse ACL rules and report the malformed ones
    Lint {
        #[arg(required = true)]
        rules: Vec<String>,
    },
    /// Print an Argon2 hash of a password, for provisioning stored secrets
    HashPassword,
}

#[derive(Serialize)]
struct AuthorizeOutput<'a> {
    request: &'a AccessRequest,
    #[serde(flatten)]
    resolution: &'a Resolution,
}

#[derive(Serialize)]
struct AuthenticateOutput<'a> {
    principal: &'a str,
    decision: AuthnDecision,
}

#[derive(Serialize)]
struct LintOutput<'a> {
    rule: &'a str,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AclGateConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(2);
            }
        },
        None => AclGateConfig::default(),
    };

    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("Error: {e}");
        return ExitCode::from(2);
    }
    tracing::debug!(config = ?args.config, "Configuration loaded");

    let json = args.json;
    let result = match args.command {
        Command::Authorize(request) => run_authorize(&config, request, json).await,
        Command::Explain(request) => run_explain(&config, request, json).await,
        Command::Authenticate { principal } => run_authenticate(&config, &principal, json).await,
        Command::Lint { rules } => run_lint(&rules, json),
        Command::HashPassword => run_hash_password().await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_authorize(config: &AclGateConfig, request: RequestArgs, json: bool) -> CliResult {
    let request = request.into_request()?;
    let chain = AuthorizerChain::from_config(&config.authz)?;
    chain.connect().await?;
    let resolution = chain.authorize(&request).await;
    chain.stop();
    let resolution = resolution?;

    if json {
        print_json(&AuthorizeOutput {
            request: &request,
            resolution: &resolution,
        })?;
    } else {
        match &resolution {
            Resolution::Granted(actions) => println!("granted: {actions}"),
            Resolution::NoMatch => println!("denied"),
        }
    }

    Ok(if resolution.is_granted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_explain(config: &AclGateConfig, request: RequestArgs, json: bool) -> CliResult {
    let request = request.into_request()?;
    let chain = AuthorizerChain::from_config(&config.authz)?;
    chain.connect().await?;
    let explanations = chain.explain(&request).await;
    chain.stop();
    let explanations = explanations?;

    if json {
        let by_backend: Vec<_> = explanations
            .iter()
            .map(|(backend, explanation)| {
                serde_json::json!({ "backend": backend, "explanation": explanation })
            })
            .collect();
        print_json(&by_backend)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("request: {request}");
    if explanations.is_empty() {
        println!("no backends evaluated rules");
    }
    for (backend, explanation) in &explanations {
        println!("\n[{backend}]");
        for (i, eval) in explanation.evaluations.iter().enumerate() {
            let marker = if explanation.selected == Some(i) { "*" } else { " " };
            if eval.matched {
                println!("{marker} {}  matched, grants: {}", eval.rule, eval.granted);
            } else {
                println!("{marker} {}  no match", eval.rule);
            }
        }
        for skipped in &explanation.skipped {
            println!("  skipped: {skipped}");
        }
        match &explanation.resolution {
            Resolution::Granted(actions) => println!("=> granted: {actions}"),
            Resolution::NoMatch => println!("=> no match"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_authenticate(config: &AclGateConfig, principal: &str, json: bool) -> CliResult {
    let password = read_password().await?;
    let chain = AuthenticatorChain::from_config(&config.authn)?;
    chain.connect().await?;
    let decision = chain.authenticate(principal, &password).await;
    chain.stop();
    let decision = decision?;

    if json {
        print_json(&AuthenticateOutput {
            principal,
            decision,
        })?;
    } else {
        match decision {
            AuthnDecision::Authenticated => println!("authenticated"),
            AuthnDecision::Rejected => println!("rejected"),
            AuthnDecision::NoMatch => println!("unknown principal"),
        }
    }

    Ok(if decision == AuthnDecision::Authenticated {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_lint(rules: &[String], json: bool) -> CliResult {
    let (_, skipped) = parse_candidates(rules);

    if json {
        let report: Vec<_> = rules
            .iter()
            .map(|rule| LintOutput {
                rule,
                error: skipped
                    .iter()
                    .find(|e| e.rule() == rule.as_str())
                    .map(|e| e.to_string()),
            })
            .collect();
        print_json(&report)?;
    } else if skipped.is_empty() {
        println!("{} rule(s) ok", rules.len());
    } else {
        for error in &skipped {
            println!("{error}");
        }
    }

    Ok(if skipped.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_hash_password() -> CliResult {
    let password = read_password().await?;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    println!("{hash}");
    Ok(ExitCode::SUCCESS)
}

/// Password from `ACLGATE_PASSWORD`, else the first line of stdin.
async fn read_password() -> Result<Password, std::io::Error> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Password::new(password));
    }

    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    Ok(Password::new(trimmed))
}
