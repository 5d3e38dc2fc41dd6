//! Terminal application state and flows.
//!
//! `App` owns the core context plus the bits only a terminal front end
//! needs: interactive prompts, keychain-backed password reuse and printing.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use errandline_core::auth::{CredentialStore, Role, SessionState};
use errandline_core::config::Config;
use errandline_core::notify::{Notice, NoticeKind, Notifier};
use errandline_core::push::{DeviceRegistrar, StaticRegistrar, UnsupportedRegistrar};
use errandline_core::resource::{FetchOutcome, Resource, ResourceView};
use errandline_core::store::FileStore;
use errandline_core::validation::LoginRequest;
use errandline_core::vendor::PriceUpdate;
use errandline_core::AppContext;

use crate::render;

/// Device token for hosts that receive pushes out of band.
pub const DEVICE_TOKEN_ENV: &str = "ERRANDLINE_DEVICE_TOKEN";

/// Prints notices to stderr so stdout stays clean for data.
#[derive(Debug, Default, Clone)]
pub struct TerminalNotifier {
    error_shown: Arc<AtomicBool>,
}

impl TerminalNotifier {
    /// Whether an error notice has been printed during this run.
    pub fn error_shown(&self) -> bool {
        self.error_shown.load(Ordering::Relaxed)
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.kind {
            NoticeKind::Success => "✓",
            NoticeKind::Error => {
                self.error_shown.store(true, Ordering::Relaxed);
                "✗"
            }
            NoticeKind::Info => "•",
        };
        eprintln!("{} {}", marker, notice.message);
    }
}

/// A failure the user has already seen as an error notice. `main` exits
/// non-zero without printing it again.
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failure already reported")
    }
}

impl std::error::Error for Reported {}

pub struct App {
    pub ctx: AppContext,
    config: Config,
    state: SessionState,
    notifier: TerminalNotifier,
}

impl App {
    pub async fn new(base_url: Option<String>) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.base_url_override = base_url;

        let store = Arc::new(FileStore::new(config.store_dir()?)?);
        let registrar: Arc<dyn DeviceRegistrar> = match std::env::var(DEVICE_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Arc::new(StaticRegistrar::new(token.trim())),
            _ => Arc::new(UnsupportedRegistrar),
        };

        let notifier = TerminalNotifier::default();
        let ctx = AppContext::new(config.clone(), store, Arc::new(notifier.clone()), registrar)?;
        let state = ctx.boot().await;
        debug!(logged_in = state.is_logged_in, "App booted");

        Ok(Self { ctx, config, state, notifier })
    }

    /// Turn a core failure into the error `main` reports. Failures the
    /// notifier already printed become `Reported`.
    fn failure(&self, message: String) -> anyhow::Error {
        failure(&self.notifier, message)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn require_role(&self) -> Result<Role> {
        self.state
            .logged_in_role()
            .ok_or_else(|| anyhow!("Not logged in. Run `errandline login` first."))
    }

    fn require(&self, role: Role) -> Result<()> {
        let current = self.require_role()?;
        if current != role {
            bail!("This command is only available to {}s", role);
        }
        Ok(())
    }

    // ===== Login =====

    /// Interactive login. Prompts for whatever was not given, offering the
    /// last used identity and any password saved in the keychain.
    pub async fn login(&mut self, role: Option<Role>, login: Option<String>) -> Result<()> {
        let role = match role {
            Some(role) => role,
            None => match self.config.last_role.as_deref().and_then(|r| r.parse::<Role>().ok()) {
                Some(role) => role,
                None => prompt_role()?,
            },
        };

        let field = if role.uses_username() { "Username" } else { "Email" };
        let login = match login {
            Some(login) => login,
            None => match self.config.last_username.clone() {
                Some(last) if self.config.last_role.as_deref() == Some(role.as_str()) => {
                    let input = prompt(&format!("{} [{}]: ", field, last))?;
                    if input.is_empty() {
                        last
                    } else {
                        input
                    }
                }
                _ => prompt(&format!("{}: ", field))?,
            },
        };

        let password = if CredentialStore::has_credentials(role, &login) {
            let input = prompt("Use stored password? [Y/n]: ")?;
            if input.to_lowercase() != "n" {
                CredentialStore::get_password(role, &login)?
            } else {
                rpassword::prompt_password("Password: ")?
            }
        } else {
            rpassword::prompt_password("Password: ")?
        };

        let request = LoginRequest::new(role, login.trim(), password);
        let state = self
            .ctx
            .session
            .authenticate(&request)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        self.state = state;

        if let Err(e) = CredentialStore::store(role, &request.login, &request.password) {
            warn!(error = %e, "Failed to save password to keychain");
        }
        self.config.last_username = Some(request.login.clone());
        self.config.last_role = Some(role.as_str().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        info!(role = %role, "Login complete");
        Ok(())
    }

    pub async fn logout(&mut self, forget: bool) -> Result<()> {
        if forget {
            if let (Some(login), Some(role)) = (
                self.config.last_username.as_deref(),
                self.config.last_role.as_deref().and_then(|r| r.parse::<Role>().ok()),
            ) {
                if let Err(e) = CredentialStore::delete(role, login) {
                    debug!(error = %e, "No saved password to forget");
                }
            }
        }
        self.ctx.session.logout().await;
        self.state = self.ctx.session.snapshot();
        Ok(())
    }

    // ===== Views =====

    /// Show cached data, then refresh unless offline.
    async fn load<R: Resource>(&self, view: &ResourceView<R>, offline: bool) -> Option<R::Payload> {
        let cached = view.hydrate();
        if offline {
            if let Some(age) = view.last_updated() {
                eprintln!("Showing cached data (updated {})", age);
            }
            return cached;
        }
        match view.refresh().await {
            FetchOutcome::Fresh(data) => Some(data),
            FetchOutcome::Fallback { cached, .. } => {
                if let Some(age) = view.last_updated() {
                    eprintln!("Showing cached data (updated {})", age);
                }
                cached
            }
            FetchOutcome::Superseded => view.current(),
        }
    }

    pub async fn show_orders(&self, offline: bool) -> Result<()> {
        let now = Utc::now();
        let orders = match self.require_role()? {
            Role::Vendor => self
                .load(&self.ctx.vendor_orders(), offline)
                .await
                .map(|book| book.orders),
            Role::Dispatcher => self.load(&self.ctx.dispatcher_orders(), offline).await,
        };
        match orders {
            Some(orders) => print!("{}", render::orders(&orders, &now)),
            None => println!("No orders available"),
        }
        Ok(())
    }

    pub fn show_order(&self, order_id: i64) -> Result<()> {
        let order = match self.require_role()? {
            Role::Vendor => self.ctx.vendor_orders().find_order(order_id),
            Role::Dispatcher => self.ctx.dispatcher_orders().find_order(order_id),
        };
        match order {
            Some(order) => print!("{}", render::order_detail(&order)),
            None => bail!("Order not found"),
        }
        Ok(())
    }

    pub async fn show_transactions(&self, offline: bool) -> Result<()> {
        let role = self.require_role()?;
        match self.load(&self.ctx.transactions(role), offline).await {
            Some(transactions) => print!("{}", render::transactions(&transactions, &Utc::now())),
            None => println!("No transactions available"),
        }
        Ok(())
    }

    pub async fn show_items(&self, offline: bool) -> Result<()> {
        self.require(Role::Vendor)?;
        match self.load(&self.ctx.vendor_items(), offline).await {
            Some(profile) => print!("{}", render::items(&profile)),
            None => println!("No items available"),
        }
        Ok(())
    }

    pub async fn show_dashboard(&self, offline: bool) -> Result<()> {
        self.require(Role::Vendor)?;
        match self.load(&self.ctx.vendor_dashboard(), offline).await {
            Some(dashboard) => print!("{}", render::dashboard(&dashboard, &Utc::now())),
            None => println!("Dashboard unavailable"),
        }
        Ok(())
    }

    /// Refresh every view the current role has, concurrently.
    pub async fn refresh_all(&self) -> Result<()> {
        let role = self.require_role()?;
        let transactions = self.ctx.transactions(role);
        let results: Vec<(&str, bool)> = match role {
            Role::Vendor => {
                let orders = self.ctx.vendor_orders();
                let dashboard = self.ctx.vendor_dashboard();
                let items = self.ctx.vendor_items();
                let (o, d, i, t) = futures::join!(
                    orders.refresh(),
                    dashboard.refresh(),
                    items.refresh(),
                    transactions.refresh()
                );
                vec![
                    ("orders", o.is_fresh()),
                    ("dashboard", d.is_fresh()),
                    ("items", i.is_fresh()),
                    ("transactions", t.is_fresh()),
                ]
            }
            Role::Dispatcher => {
                let orders = self.ctx.dispatcher_orders();
                let (o, t) = futures::join!(orders.refresh(), transactions.refresh());
                vec![("orders", o.is_fresh()), ("transactions", t.is_fresh())]
            }
        };

        let failed: Vec<&str> = results.iter().filter(|(_, ok)| !ok).map(|(name, _)| *name).collect();
        if !failed.is_empty() {
            bail!("Refresh failed for: {}", failed.join(", "));
        }
        println!("Last updated: {}", self.ctx.cache.get_cache_ages(role).last_updated());
        Ok(())
    }

    // ===== Actions =====

    pub async fn process_order(&self, order_id: i64) -> Result<()> {
        self.require(Role::Vendor)?;
        let view = self.ctx.vendor_orders();
        view.hydrate();
        let order = self
            .ctx
            .orders
            .process_order(&view, order_id)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        print!("{}", render::order_detail(&order));
        Ok(())
    }

    pub async fn complete_order(&self, order_id: i64) -> Result<()> {
        self.require(Role::Dispatcher)?;
        let view = self.ctx.dispatcher_orders();
        view.hydrate();
        let order = self
            .ctx
            .orders
            .complete_order(&view, order_id)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        print!("{}", render::order_detail(&order));
        Ok(())
    }

    pub async fn withdraw(&self, amount: &str) -> Result<()> {
        self.require(Role::Vendor)?;
        self.ctx
            .vendor
            .withdraw(amount)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        Ok(())
    }

    pub async fn update_item_price(&self, item_id: i64, update: PriceUpdate) -> Result<()> {
        self.require(Role::Vendor)?;
        self.ctx
            .vendor
            .update_item_price(item_id, &update)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        self.ctx.vendor_items().refresh().await;
        Ok(())
    }

    pub async fn delete_item(&self, item_id: i64) -> Result<()> {
        self.require(Role::Vendor)?;
        self.ctx
            .vendor
            .delete_item(item_id)
            .await
            .map_err(|e| self.failure(e.user_message()))?;
        self.ctx.vendor_items().refresh().await;
        Ok(())
    }

    // ===== Push =====

    pub fn push_status(&self) -> Result<()> {
        let token = self.ctx.push.device_token()?;
        println!(
            "Device token: {}",
            token.as_deref().map(render_token).unwrap_or_else(|| "none".to_string())
        );
        println!("Reported to backend: {}", if self.ctx.push.token_sent()? { "yes" } else { "no" });
        Ok(())
    }

    pub async fn push_sync(&self) -> Result<()> {
        self.require_role()?;
        if self.ctx.push.sync().await? {
            println!("Device token reported");
        } else {
            println!("No device token to report");
        }
        Ok(())
    }

    pub async fn push_unregister(&self) -> Result<()> {
        self.require_role()?;
        self.ctx.push.remove_from_backend().await?;
        self.ctx.push.cleanup()?;
        println!("Device token removed");
        Ok(())
    }
}

fn failure(notifier: &TerminalNotifier, message: String) -> anyhow::Error {
    if notifier.error_shown() {
        anyhow::Error::new(Reported)
    } else {
        anyhow!(message)
    }
}

/// Show only the tail of a device token.
fn render_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return token.to_string();
    }
    format!("...{}", chars[chars.len() - 8..].iter().collect::<String>())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_role() -> Result<Role> {
    loop {
        let input = prompt("Log in as (vendor/dispatcher): ")?;
        match input.to_lowercase().parse::<Role>() {
            Ok(role) => return Ok(role),
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }
}
