use crate::{
    audit::AuditLog,
    collections::{CollectionStore, ReadStatus, WriteStatus},
    config::{Config, DataSourceKind},
    data_access::{DataSource, LocalSource, RemoteSource},
    error::DataError,
    notify::{BellChime, Chime, NotificationEvent, NotificationListener, SilentChime, ToastKind, Toaster},
    records::{
        AdminAttendance, BankTransaction, CashTransaction, Collection, Expense, User,
    },
    reports::{attendance_percentage, salary_for_month, AccountsSummary},
    routes::{self, RouteDecision},
    session::{LoginOutcome, RestoreStatus, SessionState, SessionStore},
    storage::StorageAdapter,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Context {
    pub config: Config,
    pub run_id: String,
    pub storage_desc: String,
    pub session: RefCell<SessionStore>,
    pub store: Rc<CollectionStore>,
    pub source: Rc<dyn DataSource>,
    pub toaster: Rc<Toaster>,
    pub listener: Rc<RefCell<NotificationListener>>,
    pub audit: Option<RefCell<AuditLog>>,
}

impl Context {
    pub fn new(
        config: Config,
        storage: Rc<dyn StorageAdapter>,
        run_id: String,
        audit: Option<AuditLog>,
    ) -> Self {
        let storage_desc = storage.describe();
        let store = Rc::new(CollectionStore::new(
            storage.clone(),
            config.storage.id_strategy(),
        ));
        let source: Rc<dyn DataSource> = match config.data_source() {
            DataSourceKind::Local => Rc::new(LocalSource::new(store.clone())),
            DataSourceKind::Remote => Rc::new(RemoteSource::new(
                &config.api.base_url(),
                config.api.timeout_ms(),
            )),
        };

        let toaster = Rc::new(Toaster::new());
        let chime: Box<dyn Chime> = if config.notifications.chime() {
            Box::new(BellChime)
        } else {
            Box::new(SilentChime)
        };
        let listener = Rc::new(RefCell::new(NotificationListener::new(
            toaster.clone(),
            chime,
            config.notifications.toast_ms(),
        )));

        let mut session = SessionStore::new(storage, config.credentials.clone());
        {
            let source = source.clone();
            let listener = listener.clone();
            let notifications = config.notifications.enabled();
            session.subscribe(move |state| {
                let user = match state {
                    SessionState::Authenticated(identity) => Some(identity),
                    _ => None,
                };
                source.bind_role(user.map(|u| u.role));
                let mut listener = listener.borrow_mut();
                match user {
                    Some(user) if notifications => listener.connect(&user.id),
                    _ => listener.disconnect(),
                }
            });
        }

        Self {
            config,
            run_id,
            storage_desc,
            session: RefCell::new(session),
            store,
            source,
            toaster,
            listener,
            audit: audit.map(RefCell::new),
        }
    }

    /// Restore the saved session and seed the local store
    pub fn start(&self) {
        let status = self.session.borrow_mut().restore_session();
        let user_id = self.user_id();
        self.audit(|log| log.restore(restore_label(status), user_id.as_deref()));

        if self.is_local() {
            let report = self.store.ensure_seed_data();
            if report.changed() {
                let seeded = collection_names(&report.seeded);
                let initialized = collection_names(&report.initialized);
                self.audit(|log| log.seed(&seeded, &initialized));
            }
        }
    }

    fn is_local(&self) -> bool {
        self.config.data_source() == DataSourceKind::Local
    }

    fn user_id(&self) -> Option<String> {
        self.session.borrow().user().map(|u| u.id.clone())
    }

    fn audit(&self, f: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Some(log) = &self.audit {
            if let Err(e) = f(&mut log.borrow_mut()) {
                tracing::warn!(error = %e, "failed to write audit log");
            }
        }
    }

    fn prompt(&self) -> String {
        let session = self.session.borrow();
        if session.is_loading() {
            return "loading> ".to_string();
        }
        match session.user() {
            Some(user) => format!("{}> ", user.email),
            None => "sitebook> ".to_string(),
        }
    }

    fn flush_toasts(&self) {
        for toast in self.toaster.drain() {
            tracing::debug!(
                kind = toast.kind.as_str(),
                ms = toast.duration.as_millis() as u64,
                "toast"
            );
            println!("{}", toast);
        }
    }
}

fn collection_names(list: &[Collection]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

fn restore_label(status: RestoreStatus) -> &'static str {
    match status {
        RestoreStatus::Restored => "restored",
        RestoreStatus::NoSession => "no_session",
        RestoreStatus::Discarded => "discarded",
        RestoreStatus::Unavailable => "unavailable",
        RestoreStatus::AlreadyRestored => "already_restored",
    }
}

pub fn run_once(ctx: &Context, command: &str) -> Result<()> {
    let command = command.trim();
    if !command.starts_with('/') {
        return Err(anyhow::anyhow!(
            "Commands start with '/'. Try '/help'."
        ));
    }
    handle_command(ctx, command);
    ctx.flush_toasts();
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("sitebook - type /help for commands, /exit to quit");
    println!("Storage: {} ({} data)", ctx.storage_desc, ctx.source.describe());
    tracing::debug!(run_id = %ctx.run_id, "repl started");

    loop {
        match rl.readline(&ctx.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if !line.starts_with('/') {
                    println!("Commands start with '/'. Try '/help'.");
                    continue;
                }
                let exit = handle_command(&ctx, line);
                ctx.flush_toasts();
                if exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Split off the first whitespace-delimited word
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn handle_command(ctx: &Context, cmd: &str) -> bool {
    let (name, rest) = next_word(cmd);
    match name {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/login" => handle_login(ctx, rest),
        "/logout" => handle_logout(ctx, "user"),
        "/whoami" => handle_whoami(ctx),
        "/seed" => handle_seed(ctx),
        "/collections" => handle_collections(ctx),
        "/list" => handle_list(ctx, rest),
        "/get" => handle_get(ctx, rest),
        "/add" => handle_add(ctx, rest),
        "/update" => handle_update(ctx, rest),
        "/remove" => handle_remove(ctx, rest),
        "/open" => handle_open(ctx, rest),
        "/accounts" => handle_accounts(ctx),
        "/capital" => handle_capital(ctx, rest),
        "/attendance" => handle_attendance(ctx, rest),
        "/notify" => handle_notify(ctx, rest),
        "/id" => println!("{}", ctx.store.generate_id()),
        _ => println!("Unknown command: {}", name),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                          - quit");
    println!("  /help                          - show commands");
    println!("Session:");
    println!("  /login <email> <password>      - sign in");
    println!("  /logout                        - sign out");
    println!("  /whoami                        - show the signed-in user");
    println!("Records:");
    println!("  /collections                   - list collections");
    println!("  /list <collection>             - list records");
    println!("  /get <collection> <id>         - show one record");
    println!("  /add <collection> <json>       - create a record");
    println!("  /update <collection> <id> <json> - merge fields into a record");
    println!("  /remove <collection> <id>      - delete a record");
    println!("  /seed                          - insert demo data where missing");
    println!("  /id                            - generate a record id");
    println!("Pages:");
    println!("  /open <path>                   - open a page, e.g. /open /admin/projects");
    println!("  /accounts                      - capital and transaction totals");
    println!("  /capital <amount>              - set the opening capital");
    println!("  /attendance <user-id>          - attendance and salary this month");
    println!("  /notify <message|json>         - deliver a notification");
}

fn handle_login(ctx: &Context, args: &str) {
    let words = match shell_words::split(args) {
        Ok(words) => words,
        Err(e) => {
            println!("Invalid arguments: {}", e);
            return;
        }
    };
    let [email, password] = words.as_slice() else {
        println!("Usage: /login <email> <password>");
        return;
    };

    let outcome = ctx.session.borrow_mut().login(email, password);
    match outcome {
        LoginOutcome::Success(user) => {
            ctx.audit(|log| log.login(email, Some(&user.id)));
            ctx.toaster
                .show(format!("Welcome, {}", user.name), ToastKind::Success);
            println!("Signed in as {} ({})", user.name, user.role.as_str());
            println!("→ {}", routes::home(user.role));
        }
        LoginOutcome::Failure { error } => {
            ctx.audit(|log| log.login(email, None));
            ctx.toaster.show(error, ToastKind::Error);
        }
    }
}

fn handle_logout(ctx: &Context, reason: &str) {
    let user_id = ctx.user_id();
    if user_id.is_none() {
        println!("Not signed in");
        return;
    }
    let redirect = ctx.session.borrow_mut().logout();
    ctx.audit(|log| log.logout(user_id.as_deref(), reason));
    println!("Signed out");
    println!("→ {}", redirect.to);
}

fn handle_whoami(ctx: &Context) {
    let session = ctx.session.borrow();
    let Some(user) = session.user() else {
        println!("Not signed in");
        return;
    };
    println!(
        "{} <{}> ({}, id {})",
        user.name,
        user.email,
        user.role.as_str(),
        user.id
    );
    match ctx.listener.borrow().connected_user() {
        Some(_) => println!("Notifications: on"),
        None => println!("Notifications: off"),
    }
    if !session.is_site_manager() {
        return;
    }
    let email = user.email.to_lowercase();
    drop(session);

    // Site managers see the sites assigned to their profile
    let Some(users) = typed::<User>(ctx, Collection::Users) else {
        return;
    };
    match users.into_iter().find(|u| u.email.to_lowercase() == email) {
        Some(profile) if !profile.assigned_sites.is_empty() => {
            println!("Assigned sites: {}", profile.assigned_sites.join(", "))
        }
        _ => println!("No assigned sites"),
    }
}

fn handle_seed(ctx: &Context) {
    if !ctx.is_local() {
        println!("Seeding only applies to the local data source");
        return;
    }
    let report = ctx.store.ensure_seed_data();
    if report.write == Some(WriteStatus::Failed) {
        println!("Failed to save seed data");
        return;
    }
    if !report.changed() {
        println!("Nothing to seed");
        return;
    }
    let seeded = collection_names(&report.seeded);
    let initialized = collection_names(&report.initialized);
    println!("Seeded: {}", seeded.join(", "));
    println!("Initialized: {}", initialized.join(", "));
    ctx.audit(|log| log.seed(&seeded, &initialized));
}

fn handle_collections(ctx: &Context) {
    let role = ctx.session.borrow().role();
    println!("Collections:");
    for collection in Collection::ALL {
        let marker = match role {
            Some(role) if routes::role_can_write(role, collection) => " *w",
            Some(role) if routes::role_can_access(role, collection) => " *",
            _ => "",
        };
        if collection.is_document() {
            println!("  {} (document){}", collection, marker);
        } else if ctx.is_local() {
            let checked = ctx.store.get_collection_checked(collection.as_str(), Vec::new());
            let note = match checked.status {
                ReadStatus::Found => String::new(),
                ReadStatus::Missing => " (missing)".to_string(),
                ReadStatus::WrongType => " (not a list)".to_string(),
                ReadStatus::Corrupted => " (store corrupted)".to_string(),
                ReadStatus::Unavailable => " (storage unavailable)".to_string(),
            };
            println!("  {}: {}{}{}", collection, checked.value.len(), note, marker);
        } else {
            println!("  {}{}", collection, marker);
        }
    }
    if role.is_some() {
        println!("(* = shown on your pages, w = your pages save it)");
    }
}

/// The collection named by `name`, if the signed-in role may read it, or
/// write it when `write` is set
fn accessible_collection(ctx: &Context, name: &str, write: bool) -> Option<Collection> {
    if name.is_empty() {
        println!("Missing collection name. Use /collections to list them.");
        return None;
    }
    let Some(collection) = Collection::parse(name) else {
        println!("Unknown collection: {}. Use /collections to list them.", name);
        return None;
    };
    let Some(role) = ctx.session.borrow().role() else {
        println!("Please log in first");
        return None;
    };
    if !routes::role_can_access(role, collection) {
        println!(
            "{} is not available to the {} role",
            collection,
            role.as_str()
        );
        return None;
    }
    if write && !routes::role_can_write(role, collection) {
        println!("{} is read-only for the {} role", collection, role.as_str());
        return None;
    }
    Some(collection)
}

fn parse_json(text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            println!("Invalid JSON: {}", e);
            None
        }
    }
}

/// Report a failed data operation; a rejected session signs the user out
fn report_data_error(ctx: &Context, error: DataError) {
    match error {
        DataError::Unauthorized => {
            ctx.toaster
                .show("Session expired, please log in again", ToastKind::Warning);
            handle_logout(ctx, "unauthorized");
        }
        other => ctx.toaster.show(other.to_string(), ToastKind::Error),
    }
}

fn handle_list(ctx: &Context, args: &str) {
    let (name, _) = next_word(args);
    let Some(collection) = accessible_collection(ctx, name, false) else {
        return;
    };
    match ctx.source.list(collection) {
        Ok(items) => {
            if items.is_empty() {
                println!("No {}", collection);
            }
            for item in items {
                println!("{}", item);
            }
        }
        Err(e) => report_data_error(ctx, e),
    }
}

fn handle_get(ctx: &Context, args: &str) {
    let (name, rest) = next_word(args);
    let (id, _) = next_word(rest);
    if id.is_empty() {
        println!("Usage: /get <collection> <id>");
        return;
    }
    let Some(collection) = accessible_collection(ctx, name, false) else {
        return;
    };
    match ctx.source.get(collection, id) {
        Ok(item) => println!(
            "{}",
            serde_json::to_string_pretty(&item).unwrap_or_else(|_| item.to_string())
        ),
        Err(e) => report_data_error(ctx, e),
    }
}

fn handle_add(ctx: &Context, args: &str) {
    let (name, json) = next_word(args);
    if json.is_empty() {
        println!("Usage: /add <collection> <json>");
        return;
    }
    let Some(collection) = accessible_collection(ctx, name, true) else {
        return;
    };
    let Some(record) = parse_json(json) else {
        return;
    };
    let user_id = ctx.user_id();
    match ctx.source.create(collection, record) {
        Ok(created) => {
            let id = created.get("id").and_then(Value::as_str).unwrap_or("");
            ctx.audit(|log| {
                log.mutation("create", collection.as_str(), Some(id), user_id.as_deref(), true)
            });
            ctx.toaster
                .show(format!("Added to {} ({})", collection, id), ToastKind::Success);
        }
        Err(e) => {
            ctx.audit(|log| {
                log.mutation("create", collection.as_str(), None, user_id.as_deref(), false)
            });
            report_data_error(ctx, e);
        }
    }
}

fn handle_update(ctx: &Context, args: &str) {
    let (name, rest) = next_word(args);
    let (id, json) = next_word(rest);
    if json.is_empty() {
        println!("Usage: /update <collection> <id> <json>");
        return;
    }
    let Some(collection) = accessible_collection(ctx, name, true) else {
        return;
    };
    let Some(fields) = parse_json(json) else {
        return;
    };
    let user_id = ctx.user_id();
    let result = ctx.source.update(collection, id, fields);
    ctx.audit(|log| {
        log.mutation(
            "update",
            collection.as_str(),
            Some(id),
            user_id.as_deref(),
            result.is_ok(),
        )
    });
    match result {
        Ok(_) => ctx
            .toaster
            .show(format!("Updated {} ({})", collection, id), ToastKind::Success),
        Err(e) => report_data_error(ctx, e),
    }
}

fn handle_remove(ctx: &Context, args: &str) {
    let (name, rest) = next_word(args);
    let (id, _) = next_word(rest);
    if id.is_empty() {
        println!("Usage: /remove <collection> <id>");
        return;
    }
    let Some(collection) = accessible_collection(ctx, name, true) else {
        return;
    };
    let user_id = ctx.user_id();
    let result = ctx.source.delete(collection, id);
    ctx.audit(|log| {
        log.mutation(
            "delete",
            collection.as_str(),
            Some(id),
            user_id.as_deref(),
            result.is_ok(),
        )
    });
    match result {
        Ok(()) => ctx
            .toaster
            .show(format!("Removed {} ({})", collection, id), ToastKind::Success),
        Err(e) => report_data_error(ctx, e),
    }
}

fn handle_open(ctx: &Context, args: &str) {
    let (path, _) = next_word(args);
    let path = if path.is_empty() { "/" } else { path };

    let mut decision = routes::resolve(ctx.session.borrow().state(), path);
    if let RouteDecision::Redirect(to) = decision {
        println!("→ {}", to);
        decision = routes::resolve(ctx.session.borrow().state(), to);
    }

    match decision {
        RouteDecision::Loading => println!("Loading..."),
        RouteDecision::Login => println!("Login: use /login <email> <password>"),
        RouteDecision::Render(route) => {
            println!("{} ({})", route.page, path);
            for collection in route.collections {
                if collection.is_document() {
                    println!("  {}", collection);
                    continue;
                }
                match ctx.source.list(*collection) {
                    Ok(items) => println!("  {}: {}", collection, items.len()),
                    Err(e) => {
                        report_data_error(ctx, e);
                        return;
                    }
                }
            }
        }
        RouteDecision::Redirect(to) => println!("→ {}", to),
    }
}

/// Records of a collection that parse as `T`
fn typed<T: DeserializeOwned>(ctx: &Context, collection: Collection) -> Option<Vec<T>> {
    match ctx.source.list(collection) {
        Ok(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        Err(e) => {
            report_data_error(ctx, e);
            None
        }
    }
}

fn handle_accounts(ctx: &Context) {
    if accessible_collection(ctx, Collection::Accounts.as_str(), false).is_none() {
        return;
    }
    if !ctx.is_local() {
        println!("The accounts summary needs the local data source");
        return;
    }
    let accounts = ctx.store.accounts();
    let expenses = ctx.store.records::<Expense>();
    let bank = ctx.store.records::<BankTransaction>();
    let cash = ctx.store.records::<CashTransaction>();

    let summary = AccountsSummary::compute(&accounts, &expenses, &bank, &cash);
    println!("Capital:            {:.2}", summary.capital);
    println!("Total expenses:     {:.2}", summary.total_expenses);
    println!("Bank transactions:  {:.2}", summary.total_bank_transactions);
    println!("Cash transactions:  {:.2}", summary.total_cash_transactions);
}

fn handle_capital(ctx: &Context, args: &str) {
    let (amount, _) = next_word(args);
    let Ok(capital) = amount.parse::<f64>() else {
        println!("Usage: /capital <amount>");
        return;
    };
    if capital < 0.0 || !capital.is_finite() {
        println!("Capital must be a non-negative number");
        return;
    }
    if accessible_collection(ctx, Collection::Accounts.as_str(), true).is_none() {
        return;
    }
    if !ctx.is_local() {
        println!("Capital is kept in the local data source");
        return;
    }
    let mut accounts = ctx.store.accounts();
    accounts.capital = capital;
    let user_id = ctx.user_id();
    let status = ctx.store.save_accounts(&accounts);
    let ok = status == WriteStatus::Written;
    ctx.audit(|log| log.mutation("update", Collection::Accounts.as_str(), None, user_id.as_deref(), ok));
    if ok {
        ctx.toaster
            .show(format!("Capital set to {:.2}", capital), ToastKind::Success);
    } else {
        ctx.toaster
            .show("Failed to save accounts", ToastKind::Error);
    }
}

fn handle_attendance(ctx: &Context, args: &str) {
    let (user_id, _) = next_word(args);
    if user_id.is_empty() {
        println!("Usage: /attendance <user-id>");
        return;
    }
    if !ctx.session.borrow().is_admin() {
        println!("Attendance reports are available to admins");
        return;
    }
    let Some(users) = typed::<User>(ctx, Collection::Users) else {
        return;
    };
    let Some(user) = users.into_iter().find(|u| u.id == user_id) else {
        println!("No user with id '{}'", user_id);
        return;
    };
    let Some(records) = typed::<AdminAttendance>(ctx, Collection::AttendanceAdmin) else {
        return;
    };

    let today = chrono::Local::now().date_naive();
    println!("{} ({})", user.name, today.format("%B %Y"));
    println!(
        "  Attendance: {:.1}%",
        attendance_percentage(&records, &user.id, today)
    );
    println!("  Salary:     {:.0}", salary_for_month(&user, &records, today));
}

fn handle_notify(ctx: &Context, args: &str) {
    let args = args.trim();
    if args.is_empty() {
        println!("Usage: /notify <message|json>");
        return;
    }
    let event = if args.starts_with('{') {
        match serde_json::from_str::<NotificationEvent>(args) {
            Ok(event) => event,
            Err(e) => {
                println!("Invalid notification: {}", e);
                return;
            }
        }
    } else {
        NotificationEvent {
            message: args.to_string(),
            kind: None,
        }
    };
    if !ctx.listener.borrow().deliver(&event) {
        println!("Not listening for notifications");
    }
}
