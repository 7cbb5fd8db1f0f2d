use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cra_api::{
    kinds, ApiObject, ApiVersion, ImagePaths, JsonPayload, Loaded, RestApi, Versions,
};
use cra_cache::{CacheConfig, DirectoryCache};
use cra_config::CraConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cra", version, about = "CLS REST API client with a local object cache")]
struct Cli {
    /// Config file (defaults to `~/.cra/config.toml` when it exists)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Cache root; overrides the config file and `CRA_CACHE_DIR`
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// API base URL; overrides the config file and `CRA_API_URL`
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load one API object, from the cache when it is current, and print it
    Fetch(FetchArgs),
    /// Inspect or clear the local caches
    Cache(CacheArgs),
    /// Download one image for a client (once) and print its local path
    Image(ImageArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Object kind, e.g. `about-us`, `reels` or `versions`
    kind: String,
    /// Emit JSON suitable for scripts
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    /// Emit JSON suitable for scripts
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached objects
    Status,
    /// Delete cached objects and images, keeping the cache directories
    Flush,
    /// Delete the cache directories themselves
    Remove,
}

#[derive(Args)]
struct ImageArgs {
    client_id: String,
    /// Image file name, e.g. `logo.png`
    name: String,
    /// Emit JSON suitable for scripts
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;
    cra_config::init_tracing(&config.logging);

    match cli.command {
        Command::Fetch(args) => {
            let api = open_api(&config)?;
            match args.kind.as_str() {
                kinds::VERSIONS => fetch::<Versions>(&api, &args),
                kinds::IMAGE_PATHS => fetch::<ImagePaths>(&api, &args),
                _ => fetch::<JsonPayload>(&api, &args),
            }
        }
        Command::Cache(args) => {
            let cache_config = config.cache_config();
            match args.command {
                CacheCommand::Status => {
                    let status = cache_status(&cache_config)?;
                    print_cache_status(&status, args.json)?;
                }
                CacheCommand::Flush => {
                    let (objects, images) = open_caches(&cache_config)?;
                    let objects_ok = objects.flush();
                    let images_ok = images.flush();
                    anyhow::ensure!(
                        objects_ok && images_ok,
                        "failed to flush cache at {}",
                        cache_config.cache_root()?.display()
                    );
                    print_done("flushed", &cache_config, args.json)?;
                }
                CacheCommand::Remove => {
                    let (objects, images) = open_caches(&cache_config)?;
                    let objects_ok = objects.remove_all();
                    let images_ok = images.remove_all();
                    anyhow::ensure!(
                        objects_ok && images_ok,
                        "failed to remove cache at {}",
                        cache_config.cache_root()?.display()
                    );
                    print_done("removed", &cache_config, args.json)?;
                }
            }
            Ok(0)
        }
        Command::Image(args) => {
            let api = open_api(&config)?;
            match api.materialize_image(&args.client_id, &args.name) {
                Some(path) => {
                    if args.json {
                        print_json(&serde_json::json!({ "path": path }))?;
                    } else {
                        println!("{}", path.display());
                    }
                    Ok(0)
                }
                None => {
                    eprintln!("image {} for {}: not available", args.name, args.client_id);
                    Ok(1)
                }
            }
        }
    }
}

/// File, then environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<CraConfig> {
    let mut config = match &cli.config {
        Some(path) => CraConfig::load_from_path(path)?,
        None => match CraConfig::default_path() {
            Some(path) => CraConfig::load_or_default(&path)?,
            None => CraConfig::default(),
        },
    };
    config.apply_env_overrides();

    if let Some(dir) = &cli.cache_dir {
        config.cache.dir = Some(dir.clone());
    }
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

fn open_api(config: &CraConfig) -> Result<RestApi> {
    RestApi::open(config.endpoint(), &config.cache_config()).context("object cache unavailable")
}

fn open_caches(cache_config: &CacheConfig) -> Result<(DirectoryCache, DirectoryCache)> {
    let objects = DirectoryCache::open(cache_config.objects_dir()?)?;
    let images = DirectoryCache::open(cache_config.images_dir()?)?;
    Ok((objects, images))
}

#[derive(Serialize)]
struct FetchReport<'a, T> {
    kind: &'a str,
    provenance: &'static str,
    #[serde(rename = "apiVer")]
    api_ver: &'a ApiVersion,
    #[serde(rename = "apiObj")]
    api_obj: &'a T,
}

fn fetch<T>(api: &RestApi, args: &FetchArgs) -> Result<i32>
where
    T: Serialize + DeserializeOwned,
{
    let loaded: Loaded<ApiObject<T>> = match api.try_load(&args.kind) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{}: not loaded: {err}", args.kind);
            return Ok(1);
        }
    };

    let report = FetchReport {
        kind: &args.kind,
        provenance: loaded.provenance.as_str(),
        api_ver: &loaded.value.api_ver,
        api_obj: &loaded.value.api_obj,
    };

    if args.json {
        print_json(&report)?;
    } else {
        println!("{}: from {}", report.kind, report.provenance);
        println!("  version: {}", report.api_ver);
        print_json(report.api_obj)?;
    }
    Ok(0)
}

#[derive(Serialize)]
struct CacheStatus {
    root: PathBuf,
    objects: Vec<CachedObject>,
}

#[derive(Serialize)]
struct CachedObject {
    key: String,
    bytes: Option<u64>,
}

fn cache_status(cache_config: &CacheConfig) -> Result<CacheStatus> {
    let (objects, _images) = open_caches(cache_config)?;
    let entries = objects
        .keys()?
        .into_iter()
        .map(|key| CachedObject {
            bytes: std::fs::metadata(objects.resolve(&key))
                .ok()
                .map(|meta| meta.len()),
            key: key.as_str().to_owned(),
        })
        .collect();

    Ok(CacheStatus {
        root: cache_config.cache_root()?,
        objects: entries,
    })
}

fn print_cache_status(status: &CacheStatus, json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }

    println!("cache:");
    println!("  root: {}", status.root.display());
    if status.objects.is_empty() {
        println!("  objects: (none)");
        return Ok(());
    }
    println!("  objects:");
    for object in &status.objects {
        match object.bytes {
            Some(bytes) => println!("    {}: {bytes} bytes", object.key),
            None => println!("    {}: (unreadable)", object.key),
        }
    }
    Ok(())
}

fn print_done(action: &str, cache_config: &CacheConfig, json: bool) -> Result<()> {
    let root = cache_config.cache_root()?;
    if json {
        print_json(&serde_json::json!({ "ok": true, "action": action, "root": root }))
    } else {
        println!("cache: {action} {}", root.display());
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
