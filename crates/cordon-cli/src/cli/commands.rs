//! Command handlers. Every handler prints one JSON document to stdout.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use cordon_engine::{Engine, EngineError, LookupOutcome, UpdateOutcome};
use serde_json::{json, Value};

use super::args::{BatchArgs, LookupArgs};

pub async fn update(engine: &Engine) -> Result<()> {
    let outcome = engine.run_update().await?;
    print_json(&outcome_json(&outcome));
    Ok(())
}

pub async fn lookup(engine: &Engine, args: &LookupArgs) -> Result<()> {
    if args.update {
        engine.run_update().await.context("pre-lookup update")?;
    }

    match engine.lookup(&args.ip, args.dnsbl).await {
        Ok(LookupOutcome::Found(payload)) => {
            print_json(&Value::Object(payload.as_map().clone()));
            Ok(())
        }
        Ok(LookupOutcome::NotFound) => {
            print_json(&json!({ "status": "not_found", "ip": args.ip }));
            std::process::exit(4);
        }
        Err(EngineError::InvalidIp(ip)) => {
            bail!("not an IPv4 address: {ip}");
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn batch(engine: &Engine, args: &BatchArgs) -> Result<()> {
    if args.update {
        engine.run_update().await.context("pre-batch update")?;
    }

    let ips = read_ips(&args.file)?;
    let entries = engine.lookup_batch(&ips).await;

    let mut out = serde_json::Map::new();
    for entry in entries {
        let value = if entry.invalid {
            json!({ "error": "invalid" })
        } else {
            match entry.payload {
                Some(payload) => Value::Object(payload.as_map().clone()),
                None => Value::Object(serde_json::Map::new()),
            }
        };
        out.insert(entry.ip, value);
    }
    print_json(&Value::Object(out));
    Ok(())
}

pub async fn health(engine: &Engine) -> Result<()> {
    let snapshot = engine.health().await;
    print_json(&serde_json::to_value(&snapshot)?);
    Ok(())
}

pub async fn serve(engine: &Engine) -> Result<()> {
    engine.run_scheduled().await?;
    Ok(())
}

fn outcome_json(outcome: &UpdateOutcome) -> Value {
    match outcome {
        UpdateOutcome::Completed { records } => {
            json!({ "status": "completed", "records": records })
        }
        UpdateOutcome::Skipped { reason } => {
            json!({ "status": "skipped", "reason": reason })
        }
    }
}

fn read_ips(file: &str) -> Result<Vec<String>> {
    let lines: Vec<String> = if file == "-" {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("reading {file}"))?
            .lines()
            .map(String::from)
            .collect()
    };
    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
