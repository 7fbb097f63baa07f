// Login screen

use super::{BasePage, HomePage, Screen, ValidationReport};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

const USERNAME_INPUT: &str = "#username";
const PASSWORD_INPUT: &str = "#password";
const LOGIN_BUTTON: &str = "#loginBtn";
const ERROR_MESSAGE: &str = ".error-message";
const FORGOT_PASSWORD_LINK: &str = "#forgotPassword";
const REMEMBER_ME_CHECKBOX: &str = "#rememberMe";

/// The sign-in form.
#[derive(Debug)]
pub struct LoginPage {
    base: BasePage,
}

/// A login attempt that did not reach the home screen.
///
/// Hands the login screen back so the caller can inspect the form.
pub struct LoginRejected {
    /// Text of the error indicator; empty when none was shown
    pub message: String,
    pub page: LoginPage,
}

impl fmt::Debug for LoginRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRejected")
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for LoginRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str("login rejected")
        } else {
            write!(f, "login rejected: {}", self.message)
        }
    }
}

impl std::error::Error for LoginRejected {}

#[async_trait]
impl Screen for LoginPage {
    const NAME: &'static str = "LoginPage";

    fn from_base(base: BasePage) -> Self {
        Self { base }
    }

    fn base(&self) -> &BasePage {
        &self.base
    }

    fn into_base(self) -> BasePage {
        self.base
    }

    async fn is_loaded(&self) -> Result<bool> {
        self.base.is_visible(LOGIN_BUTTON).await
    }
}

impl LoginPage {
    pub async fn enter_username(&self, username: &str) -> Result<()> {
        self.base.fill(USERNAME_INPUT, username).await
    }

    pub async fn enter_password(&self, password: &str) -> Result<()> {
        self.base.fill(PASSWORD_INPUT, password).await
    }

    pub async fn click_login(&self) -> Result<()> {
        self.base.click(LOGIN_BUTTON).await
    }

    pub async fn check_remember_me(&self) -> Result<()> {
        self.base.check(REMEMBER_ME_CHECKBOX).await
    }

    pub async fn click_forgot_password(&self) -> Result<()> {
        self.base.click(FORGOT_PASSWORD_LINK).await
    }

    /// Submits the form and waits for the page to settle.
    ///
    /// Returns the home screen when it loaded, otherwise the rejection with
    /// the login screen handed back.
    pub async fn login(
        self,
        username: &str,
        password: &str,
    ) -> Result<std::result::Result<HomePage, LoginRejected>> {
        self.enter_username(username).await?;
        self.enter_password(password).await?;
        self.click_login().await?;
        self.base.wait_for_page_load().await?;

        let home: HomePage = self.base.transition();
        if home.is_loaded().await? {
            tracing::info!(username, "Login accepted");
            return Ok(Ok(home));
        }

        let page: LoginPage = home.into_base().transition();
        let message = if page.is_error_shown().await? {
            page.error_text().await?
        } else {
            String::new()
        };
        tracing::info!(username, message, "Login rejected");
        Ok(Err(LoginRejected { message, page }))
    }

    pub async fn is_login_enabled(&self) -> Result<bool> {
        self.base.is_enabled(LOGIN_BUTTON).await
    }

    pub async fn is_error_shown(&self) -> Result<bool> {
        self.base.is_visible(ERROR_MESSAGE).await
    }

    pub async fn error_text(&self) -> Result<String> {
        self.base.read_text(ERROR_MESSAGE).await
    }

    /// Submits with only the password filled and expects an error.
    pub async fn validate_username_required(&self) -> Result<bool> {
        self.enter_username("").await?;
        self.enter_password("password").await?;
        self.click_login().await?;
        self.is_error_shown().await
    }

    /// Submits with only the username filled and expects an error.
    pub async fn validate_password_required(&self) -> Result<bool> {
        self.enter_username("username").await?;
        self.enter_password("").await?;
        self.click_login().await?;
        self.is_error_shown().await
    }

    /// Visibility of every form element.
    pub async fn validate_form_components(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        report.record("username input", self.base.is_visible(USERNAME_INPUT).await?);
        report.record("password input", self.base.is_visible(PASSWORD_INPUT).await?);
        report.record("login button", self.base.is_visible(LOGIN_BUTTON).await?);
        report.record(
            "forgot password link",
            self.base.is_visible(FORGOT_PASSWORD_LINK).await?,
        );
        tracing::info!(%report, "Login form components validated");
        Ok(report)
    }
}
