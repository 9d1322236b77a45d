//! Propfinder CLI
//!
//! Command-line front end for the Propfinder session client.
//!
//! # Usage
//!
//! ```bash
//! # Log in and store the session token
//! propfinder login admin --password password
//!
//! # Issue an authenticated request
//! propfinder get properties/
//!
//! # Search listings
//! propfinder property list --address "Main St" --min-value 100000
//!
//! # Forget the session
//! propfinder logout
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use propfinder_client::{
    ClientError, Component, NewProperty, PropertyPage, PropertyQuery, PropertyUpdate,
};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod session;

use session::Session;

#[derive(Parser)]
#[command(name = "propfinder")]
#[command(about = "Session client for the Property Finder API")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange credentials for a session token
    Login {
        /// Username
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Clear the stored session token
    Logout,

    /// Show whether a session token is stored
    Token {
        /// Print the raw token value
        #[arg(long)]
        show: bool,
    },

    /// Store a session token directly
    SetToken {
        /// Token value
        token: String,
    },

    /// Send an authenticated GET request and print the JSON response
    Get {
        /// Path relative to the base URL (e.g., properties/1)
        path: String,
    },

    /// Search, inspect and edit properties
    Property {
        #[command(subcommand)]
        command: PropertyCommands,
    },

    /// List the client-side routes
    Routes,

    /// Resolve a client-side path to its route and view
    Resolve {
        /// Path to resolve (e.g., /properties/42)
        path: String,
    },
}

#[derive(Subcommand)]
enum PropertyCommands {
    /// Search property listings
    List(ListArgs),

    /// Show one property
    Show {
        /// Property ID
        id: i64,
    },

    /// Create a property
    Create(CreateArgs),

    /// Update fields of a property
    Update {
        /// Property ID
        id: i64,

        #[command(flatten)]
        fields: AddressArgs,
    },

    /// Delete a property
    Delete {
        /// Property ID
        id: i64,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Words to match against the address
    #[arg(long)]
    address: Option<String>,

    /// Property class (e.g., "Two Story")
    #[arg(long)]
    class: Option<String>,

    /// Building use (e.g., "Single Family")
    #[arg(long = "use")]
    bldg_use: Option<String>,

    /// Minimum estimated market value
    #[arg(long)]
    min_value: Option<u64>,

    /// Maximum estimated market value
    #[arg(long)]
    max_value: Option<u64>,

    /// Minimum building square feet
    #[arg(long)]
    min_sqft: Option<u64>,

    /// Maximum building square feet
    #[arg(long)]
    max_sqft: Option<u64>,

    /// Results to skip
    #[arg(long, default_value_t = 0)]
    skip: u32,

    /// Page size
    #[arg(long, default_value_t = propfinder_client::property::DEFAULT_PAGE_SIZE)]
    limit: u32,
}

impl ListArgs {
    fn into_query(self) -> PropertyQuery {
        PropertyQuery {
            full_address: self.address,
            class_description: self.class,
            estimated_market_value_min: self.min_value,
            estimated_market_value_max: self.max_value,
            bldg_use: self.bldg_use,
            building_sq_ft_min: self.min_sqft,
            building_sq_ft_max: self.max_sqft,
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    house_no: String,
    #[arg(long, default_value = "")]
    dir: String,
    #[arg(long)]
    street: String,
    #[arg(long, default_value = "")]
    suffix: String,
    #[arg(long, default_value = "")]
    apt: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    zip: String,
    #[arg(long, allow_negative_numbers = true)]
    longitude: f64,
    #[arg(long, allow_negative_numbers = true)]
    latitude: f64,
}

impl From<CreateArgs> for NewProperty {
    fn from(args: CreateArgs) -> Self {
        Self {
            longitude: args.longitude,
            latitude: args.latitude,
            zip: args.zip,
            house_no: args.house_no,
            dir: args.dir,
            street: args.street,
            suffix: args.suffix,
            apt: args.apt,
            city: args.city,
        }
    }
}

#[derive(Args)]
struct AddressArgs {
    #[arg(long)]
    house_no: Option<String>,
    #[arg(long)]
    dir: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    suffix: Option<String>,
    #[arg(long)]
    apt: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,
}

impl From<AddressArgs> for PropertyUpdate {
    fn from(args: AddressArgs) -> Self {
        Self {
            longitude: args.longitude,
            latitude: args.latitude,
            zip: args.zip,
            house_no: args.house_no,
            dir: args.dir,
            street: args.street,
            suffix: args.suffix,
            apt: args.apt,
            city: args.city,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = Session::open(cli.config.as_deref())?;

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            login(&session, &username, &password).await
        }
        Commands::Logout => logout(&session),
        Commands::Token { show } => show_token(&session, show),
        Commands::SetToken { token } => set_token(&session, &token),
        Commands::Get { path } => get(&session, &path).await,
        Commands::Property { command } => property(&session, command).await,
        Commands::Routes => {
            list_routes(&session);
            Ok(())
        }
        Commands::Resolve { path } => resolve(&session, &path).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(session: &Session, username: &str, password: &str) -> Result<()> {
    match session.client.login(username, password).await {
        Ok(_) => {
            info!("logged in as {}", username);
            println!("Logged in as {}", username);
            Ok(())
        }
        Err(ClientError::SessionExpired { .. }) => bail!("Incorrect username or password"),
        Err(e) => Err(e).context("Login failed"),
    }
}

fn logout(session: &Session) -> Result<()> {
    session.client.logout().context("Failed to clear session token")?;
    println!("Logged out");
    Ok(())
}

fn show_token(session: &Session, show: bool) -> Result<()> {
    let token = session
        .client
        .token_store()
        .get()
        .context("Failed to read session token")?;

    match token {
        Some(token) if show => println!("{}", token.expose()),
        Some(token) => println!("Token stored ({})", token),
        None => println!("Not logged in"),
    }
    Ok(())
}

fn set_token(session: &Session, token: &str) -> Result<()> {
    session
        .client
        .set_auth_token(Some(token))
        .context("Failed to store session token")?;
    if token.is_empty() {
        println!("Token cleared");
    } else {
        println!("Token stored");
    }
    Ok(())
}

async fn get(session: &Session, path: &str) -> Result<()> {
    match session.client.get(path).await {
        Ok(response) => {
            let body = match response.json::<serde_json::Value>() {
                Ok(value) => serde_json::to_string_pretty(&value)?,
                Err(_) => response.text(),
            };
            println!("{}", body);
            Ok(())
        }
        Err(e) if e.is_session_expired() && session.redirected_to_login() => {
            bail!(
                "Session expired; redirected to {}. Run `propfinder login` to sign in again.",
                session.config.login_path
            )
        }
        Err(e) => Err(e).with_context(|| format!("GET {} failed", path)),
    }
}

/// Attach the session-expiry hint or a friendly 404 to a failed property call.
fn explain(session: &Session, error: ClientError, action: String) -> anyhow::Error {
    if error.is_session_expired() && session.redirected_to_login() {
        return anyhow::anyhow!(
            "Session expired; redirected to {}. Run `propfinder login` to sign in again.",
            session.config.login_path
        );
    }
    if error.status() == Some(404) {
        return anyhow::Error::new(error).context(format!("{}: property not found", action));
    }
    anyhow::Error::new(error).context(action)
}

async fn property(session: &Session, command: PropertyCommands) -> Result<()> {
    let client = &session.client;
    match command {
        PropertyCommands::List(args) => {
            let query = args.into_query();
            let page = client
                .list_properties(&query)
                .await
                .map_err(|e| explain(session, e, "Property search failed".to_string()))?;
            print_page(&page, &query);
        }
        PropertyCommands::Show { id } => {
            let detail = client
                .get_property(id)
                .await
                .map_err(|e| explain(session, e, format!("Failed to fetch property {}", id)))?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        PropertyCommands::Create(args) => {
            let created = client
                .create_property(&NewProperty::from(args))
                .await
                .map_err(|e| explain(session, e, "Failed to create property".to_string()))?;
            match created.id {
                Some(id) => println!("Created property {}", id),
                None => println!("Created property"),
            }
        }
        PropertyCommands::Update { id, fields } => {
            let update = PropertyUpdate::from(fields);
            if update.is_empty() {
                bail!("Nothing to update; pass at least one field");
            }
            client
                .update_property(id, &update)
                .await
                .map_err(|e| explain(session, e, format!("Failed to update property {}", id)))?;
            println!("Updated property {}", id);
        }
        PropertyCommands::Delete { id } => {
            client
                .delete_property(id)
                .await
                .map_err(|e| explain(session, e, format!("Failed to delete property {}", id)))?;
            println!("Deleted property {}", id);
        }
    }
    Ok(())
}

fn print_page(page: &PropertyPage, query: &PropertyQuery) {
    if page.properties.is_empty() {
        println!("No properties found");
        return;
    }
    for listing in &page.properties {
        let value = listing
            .estimated_market_value
            .map(|v| format!("${}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>8}  {:<40} {:>12}  {}",
            listing.id,
            listing.full_address,
            value,
            listing.class_description.as_deref().unwrap_or("-")
        );
    }
    if page.more_exists {
        println!("More results: --skip {}", query.next_page().skip);
    }
}

fn list_routes(session: &Session) {
    for route in session.router.routes() {
        let loading = match &route.component {
            Component::Eager(view) => view.name.clone(),
            Component::Lazy(lazy) => format!("lazy chunk {:?}", lazy.chunk()),
        };
        let props = if route.props { ", props" } else { "" };
        println!("{:<20} {:<16} ({}{})", route.path, route.name, loading, props);
    }
}

async fn resolve(session: &Session, path: &str) -> Result<()> {
    let matched = session
        .router
        .resolve(path)
        .with_context(|| format!("No route matches {}", path))?;
    let view = session.router.view(&matched).await?;

    println!("Route: {}", matched.name);
    println!("View:  {}", view.name);
    for (name, value) in &matched.params {
        println!("Param: {} = {}", name, value);
    }
    let props = matched.props();
    if !props.is_empty() {
        println!("Props: {}", serde_json::to_string(&props)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use propfinder_client::{ClientConfig, Token};
    use propfinder_core::StorageBackend;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer, dir: &TempDir) -> Session {
        Session::from_config(ClientConfig {
            base_url: server.uri(),
            storage: StorageBackend::File,
            storage_path: Some(dir.path().join("storage.json")),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_cli_parses_login() {
        let cli = Cli::try_parse_from(["propfinder", "login", "admin", "-p", "secret"]).unwrap();
        match cli.command {
            Commands::Login { username, password } => {
                assert_eq!(username, "admin");
                assert_eq!(password.as_deref(), Some("secret"));
            }
            _ => panic!("expected login command"),
        }
    }

    #[test]
    fn test_cli_parses_property_list() {
        let cli = Cli::try_parse_from([
            "propfinder", "property", "list", "--address", "Main St", "--use", "Single Family",
            "--min-value", "100000", "--limit", "5",
        ])
        .unwrap();
        let Commands::Property { command: PropertyCommands::List(args) } = cli.command else {
            panic!("expected property list command");
        };

        let query = args.into_query();
        assert_eq!(query.full_address.as_deref(), Some("Main St"));
        assert_eq!(query.bldg_use.as_deref(), Some("Single Family"));
        assert_eq!(query.estimated_market_value_min, Some(100_000));
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn test_cli_parses_negative_longitude() {
        let cli = Cli::try_parse_from([
            "propfinder", "property", "update", "7", "--longitude", "-87.6", "--city", "Chicago",
        ])
        .unwrap();
        let Commands::Property { command: PropertyCommands::Update { id, fields } } = cli.command
        else {
            panic!("expected property update command");
        };

        let update = PropertyUpdate::from(fields);
        assert_eq!(id, 7);
        assert_eq!(update.longitude, Some(-87.6));
        assert_eq!(update.city.as_deref(), Some("Chicago"));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["propfinder", "get", "properties/", "-v", "-c", "/tmp/p.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);

        login(&session, "admin", "password").await.unwrap();

        assert_eq!(
            session.config.token_store().unwrap().get().unwrap(),
            Some(Token::new("jwt"))
        );
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);

        let error = login(&session, "admin", "wrong").await.unwrap_err();
        assert_eq!(error.to_string(), "Incorrect username or password");
    }

    #[tokio::test]
    async fn test_get_reports_redirect_on_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);
        set_token(&session, "stale").unwrap();

        let error = get(&session, "properties/").await.unwrap_err();

        assert!(error.to_string().starts_with("Session expired; redirected to /"));
        assert!(session.redirected_to_login());
    }

    #[tokio::test]
    async fn test_get_other_failure_keeps_router() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties/9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);

        let error = get(&session, "properties/9").await.unwrap_err();

        let cause = error.downcast_ref::<ClientError>().unwrap();
        assert_eq!(cause.status(), Some(404));
        assert!(session.router.current().is_none());
    }

    #[tokio::test]
    async fn test_property_show_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties/77"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Property not found"})),
            )
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);

        let error = property(&session, PropertyCommands::Show { id: 77 })
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Failed to fetch property 77: property not found");
        assert_eq!(error.downcast_ref::<ClientError>().unwrap().status(), Some(404));
    }

    #[tokio::test]
    async fn test_property_list_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties_listings/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let session = session_for(&server, &dir);

        let args = ListArgs {
            address: None,
            class: None,
            bldg_use: None,
            min_value: None,
            max_value: None,
            min_sqft: None,
            max_sqft: None,
            skip: 0,
            limit: 25,
        };
        let error = property(&session, PropertyCommands::List(args)).await.unwrap_err();

        assert!(error.to_string().starts_with("Session expired; redirected to /"));
    }

    #[tokio::test]
    async fn test_property_update_requires_a_field() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        let session = session_for(&server, &dir);
        let fields = AddressArgs {
            house_no: None,
            dir: None,
            street: None,
            suffix: None,
            apt: None,
            city: None,
            zip: None,
            longitude: None,
            latitude: None,
        };

        let error = property(&session, PropertyCommands::Update { id: 1, fields })
            .await
            .unwrap_err();
        assert!(error.to_string().starts_with("Nothing to update"));
    }

    #[test]
    fn test_logout_and_set_token() {
        let dir = TempDir::new().unwrap();
        let session = Session::from_config(ClientConfig {
            storage: StorageBackend::File,
            storage_path: Some(dir.path().join("storage.json")),
            ..ClientConfig::default()
        })
        .unwrap();

        set_token(&session, "abc").unwrap();
        assert!(session.client.is_authenticated());

        logout(&session).unwrap();
        assert!(!session.client.is_authenticated());
        assert!(session.config.token_store().unwrap().get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_known_and_unknown_paths() {
        let dir = TempDir::new().unwrap();
        let session = Session::from_config(ClientConfig {
            storage: StorageBackend::Memory,
            storage_path: Some(dir.path().join("unused.json")),
            ..ClientConfig::default()
        })
        .unwrap();

        assert!(resolve(&session, "/properties/5").await.is_ok());
        assert!(resolve(&session, "/nowhere").await.is_err());
    }
}
