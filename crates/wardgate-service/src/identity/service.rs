//! Identity service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use wardgate_activity::{ActivityRecorder, AnomalyDetector, AuditWriter};
use wardgate_auth::password::{PasswordHasher, PasswordValidator};
use wardgate_auth::rbac::{PermissionResolver, RoleManager};
use wardgate_auth::session::SessionManager;
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::UserId;
use wardgate_database::store::UserStore;
use wardgate_entity::audit::AuditAction;
use wardgate_entity::session::EndReason;
use wardgate_entity::user::{NewUser, User, UserChanges, UserProfile};

use crate::context::RequestContext;

/// Longest accepted phone number, in digits.
const MAX_PHONE_DIGITS: usize = 15;

/// Request to create a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,
    pub phone: String,
    #[validate(email(message = "Email address is malformed"))]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
}

/// Creates, updates, and deactivates users.
#[derive(Clone)]
pub struct IdentityService {
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) hasher: PasswordHasher,
    pub(crate) validator: Arc<PasswordValidator>,
    pub(crate) sessions: SessionManager,
    pub(crate) resolver: PermissionResolver,
    pub(crate) roles: RoleManager,
    pub(crate) recorder: ActivityRecorder,
    pub(crate) detector: AnomalyDetector,
    pub(crate) audit: AuditWriter,
    pub(crate) clock: Arc<dyn Clock>,
}

impl IdentityService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        validator: Arc<PasswordValidator>,
        sessions: SessionManager,
        roles: RoleManager,
        recorder: ActivityRecorder,
        detector: AnomalyDetector,
        audit: AuditWriter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            validator,
            sessions,
            resolver: roles.resolver().clone(),
            roles,
            recorder,
            detector,
            audit,
            clock,
        }
    }

    /// Create a regular user.
    pub async fn create_user(&self, ctx: &RequestContext, req: CreateUserRequest) -> AppResult<User> {
        self.create(ctx, req, false).await
    }

    /// Create an active staff superuser.
    pub async fn create_superuser(
        &self,
        ctx: &RequestContext,
        req: CreateUserRequest,
    ) -> AppResult<User> {
        self.create(ctx, req, true).await
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateUserRequest,
        superuser: bool,
    ) -> AppResult<User> {
        let req = CreateUserRequest {
            username: req.username.trim().to_string(),
            phone: req.phone.trim().to_string(),
            email: req
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            ..req
        };
        req.validate()
            .map_err(|e| AppError::validation(format!("Invalid user: {e}")))?;
        validate_phone(&req.phone)?;
        self.validator.validate(
            &req.password,
            &[
                req.username.as_str(),
                req.phone.as_str(),
                req.first_name.as_str(),
                req.last_name.as_str(),
            ],
        )?;

        let user = self
            .users
            .insert(&NewUser {
                username: req.username,
                phone: req.phone,
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash: self.hasher.hash_password(&req.password)?,
                is_active: true,
                is_staff: req.is_staff || superuser,
                is_superuser: superuser,
            })
            .await?;

        info!(
            user_id = %user.id,
            username = %user.username,
            is_staff = user.is_staff,
            is_superuser = user.is_superuser,
            "User created"
        );
        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::Create,
                Some(user.id),
                json!({
                    "username": user.username,
                    "is_staff": user.is_staff,
                    "is_superuser": user.is_superuser,
                    "operator": ctx.operator(),
                }),
                ctx.ip(),
            )
            .await;
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> AppResult<User> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    pub async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        self.users.find_by_phone(phone).await
    }

    /// Replace the password. The plaintext is only ever hashed.
    pub async fn set_password(
        &self,
        ctx: &RequestContext,
        id: UserId,
        plaintext: &str,
    ) -> AppResult<()> {
        let user = self.get(id).await?;
        self.validator
            .validate(plaintext, &[user.username.as_str(), user.phone.as_str()])?;
        let hash = self.hasher.hash_password(plaintext)?;
        self.users.set_password_hash(id, &hash).await?;
        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::Update,
                Some(id),
                json!({ "fields": ["password"], "operator": ctx.operator() }),
                ctx.ip(),
            )
            .await;
        Ok(())
    }

    /// Constant-time check of `plaintext` against the stored verifier.
    pub fn verify_password(&self, user: &User, plaintext: &str) -> AppResult<bool> {
        self.hasher.verify_password(plaintext, &user.password_hash)
    }

    /// Deactivate a user: the row stays, sessions end, cached permissions go.
    pub async fn deactivate(
        &self,
        ctx: &RequestContext,
        id: UserId,
        reason: Option<&str>,
    ) -> AppResult<User> {
        let user = self.users.set_active(id, false).await?;
        self.resolver.user_changed(id);
        self.end_sessions(ctx, id).await?;
        info!(user_id = %id, reason = reason.unwrap_or(""), "User deactivated");
        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::Deactivate,
                Some(id),
                json!({ "reason": reason, "operator": ctx.operator() }),
                ctx.ip(),
            )
            .await;
        Ok(user)
    }

    pub async fn activate(&self, ctx: &RequestContext, id: UserId) -> AppResult<User> {
        let user = self.users.set_active(id, true).await?;
        self.resolver.user_changed(id);
        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::Update,
                Some(id),
                json!({ "is_active": true, "operator": ctx.operator() }),
                ctx.ip(),
            )
            .await;
        Ok(user)
    }

    /// Change names and email.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        id: UserId,
        changes: UserChanges,
    ) -> AppResult<User> {
        if let Some(Some(email)) = &changes.email {
            validate_email(email)?;
        }
        let mut fields = Vec::new();
        if changes.first_name.is_some() {
            fields.push("first_name");
        }
        if changes.last_name.is_some() {
            fields.push("last_name");
        }
        if changes.email.is_some() {
            fields.push("email");
        }

        let user = self.users.update_fields(id, &changes).await?;
        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::Update,
                Some(id),
                json!({ "fields": fields, "operator": ctx.operator() }),
                ctx.ip(),
            )
            .await;
        Ok(user)
    }

    /// Change staff/superuser flags. Every session of the user ends.
    pub async fn set_privileges(
        &self,
        ctx: &RequestContext,
        id: UserId,
        is_staff: bool,
        is_superuser: bool,
    ) -> AppResult<User> {
        if is_superuser && !is_staff {
            return Err(AppError::validation("A superuser must also be staff"));
        }
        let before = self.get(id).await?;
        let user = self.users.set_flags(id, is_staff, is_superuser).await?;
        self.resolver.user_changed(id);
        self.end_sessions(ctx, id).await?;

        self.audit
            .audit(
                ctx.actor_id,
                AuditAction::PrivilegeChange,
                Some(id),
                json!({
                    "old": { "is_staff": before.is_staff, "is_superuser": before.is_superuser },
                    "new": { "is_staff": user.is_staff, "is_superuser": user.is_superuser },
                    "operator": ctx.operator(),
                }),
                ctx.ip(),
            )
            .await;
        Ok(user)
    }

    /// The user's profile, created empty on first access.
    pub async fn profile(&self, id: UserId) -> AppResult<UserProfile> {
        self.users.profile(id, self.clock.now()).await
    }

    /// Full name, falling back to the username.
    pub fn display_name(&self, user: &User) -> String {
        user.display_name()
    }

    /// End every session of `id` for security reasons and record each.
    pub(crate) async fn end_sessions(&self, ctx: &RequestContext, id: UserId) -> AppResult<usize> {
        let ended = self
            .sessions
            .invalidate_all_for_user(id, EndReason::Security)
            .await?;
        for session in &ended {
            self.recorder
                .record_logout(id, &session.token_hash, EndReason::Security, &ctx.client())
                .await;
        }
        Ok(ended.len())
    }
}

fn validate_phone(phone: &str) -> AppResult<()> {
    if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("Phone number must be a non-empty digit string"));
    }
    if phone.len() > MAX_PHONE_DIGITS {
        return Err(AppError::validation(format!(
            "Phone number must be at most {MAX_PHONE_DIGITS} digits"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    use validator::ValidateEmail;
    if email.validate_email() {
        Ok(())
    } else {
        Err(AppError::validation("Email address is malformed"))
    }
}
