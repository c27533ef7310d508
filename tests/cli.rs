//! CLI integration tests for devmarks admin commands.
//!
//! Each test uses an isolated temp directory for the database and the client
//! credentials, ensuring tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use devmarks::auth::AuthService;
use devmarks::store::{SqliteStore, Store};
use devmarks::types::Role;
use predicates::prelude::*;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Adm1n-secret";

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("devmarks").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .env("DEVMARKS_CONFIG_DIR", self.temp_dir.path().join("config"))
            .env_remove("DEVMARKS_ADMIN_PASSWORD")
            .env_remove("DEVMARKS_PASSWORD");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--admin-email",
                ADMIN_EMAIL,
                "--admin-password",
                ADMIN_PASSWORD,
                "--non-interactive",
            ])
            .assert()
    }

    fn set_role(&self, action: &str, email: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                action,
                "--data-dir",
                &self.data_dir_str(),
                "--email",
                email,
            ])
            .assert()
    }

    fn store(&self) -> Arc<dyn Store> {
        Arc::new(SqliteStore::new(db_path(&self.data_dir())).expect("open store"))
    }

    fn add_user(&self, email: &str) {
        let auth = AuthService::new(self.store(), None);
        auth.sign_up(email, "Us3r-secret!").expect("sign up");
    }

    fn role_of(&self, email: &str) -> Role {
        let store = self.store();
        let account = store
            .get_account_by_email(email)
            .expect("query account")
            .expect("account exists");
        store
            .get_profile(&account.id)
            .expect("query profile")
            .expect("profile exists")
            .role
    }
}

fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("devmarks.db")
}

#[test]
fn init_creates_database_admin_and_config() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Administrator: admin@example.com"));

    ctx.temp_dir.child("data/devmarks.db").assert(predicate::path::exists());
    ctx.temp_dir
        .child("data/devmarks.toml")
        .assert(predicate::str::contains("token_ttl_hours"));
    assert_eq!(ctx.role_of(ADMIN_EMAIL), Role::Admin);
}

#[test]
fn init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_non_interactive_requires_credentials() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--admin-email is required"));
}

#[test]
fn init_rejects_weak_password() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--admin-email",
            ADMIN_EMAIL,
            "--admin-password",
            "password",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password must contain"));
}

#[test]
fn promote_and_demote() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("ana@example.com");
    assert_eq!(ctx.role_of("ana@example.com"), Role::User);

    ctx.set_role("promote", "ana@example.com")
        .success()
        .stdout(predicate::str::contains("is now admin"));
    assert_eq!(ctx.role_of("ana@example.com"), Role::Admin);

    ctx.set_role("promote", "ana@example.com")
        .success()
        .stdout(predicate::str::contains("already admin"));

    ctx.set_role("demote", "ana@example.com")
        .success()
        .stdout(predicate::str::contains("is now user"));
    assert_eq!(ctx.role_of("ana@example.com"), Role::User);
}

#[test]
fn demote_last_admin_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.set_role("demote", ADMIN_EMAIL)
        .failure()
        .stderr(predicate::str::contains("last administrator"));
    assert_eq!(ctx.role_of(ADMIN_EMAIL), Role::Admin);
}

#[test]
fn promote_unknown_email_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.set_role("promote", "nobody@example.com")
        .failure()
        .stderr(predicate::str::contains("No account"));
}

#[test]
fn promote_without_database_fails() {
    let ctx = TestContext::new();

    ctx.set_role("promote", ADMIN_EMAIL)
        .failure()
        .stderr(predicate::str::contains("Database not found"));
}

#[test]
fn client_commands_require_login() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["page", "add", "--title", "Docs", "--url", "https://docs.rs", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));

    ctx.cmd()
        .args(["user", "list", "--role", "owner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--role must be one of"));
}
