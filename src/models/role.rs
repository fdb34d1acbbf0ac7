use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Institute,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Institute => "institute",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 角色定义（启动时写入 roles 表）
#[derive(Debug, Clone, Copy)]
pub struct RoleDefinition {
    pub role: Role,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

pub const DEFAULT_ROLES: [RoleDefinition; 4] = [
    RoleDefinition {
        role: Role::Admin,
        description: "Platform administrator",
        permissions: &[
            "reports:create",
            "reports:read:any",
            "reports:regenerate:any",
            "reports:delete:any",
            "analytics:read:any",
        ],
    },
    RoleDefinition {
        role: Role::Institute,
        description: "Institute administrator",
        permissions: &[
            "reports:create",
            "reports:read:institute",
            "reports:regenerate:own",
            "reports:delete:own",
            "analytics:read:institute",
        ],
    },
    RoleDefinition {
        role: Role::Teacher,
        description: "Institute teacher",
        permissions: &[
            "reports:create",
            "reports:read:institute",
            "reports:regenerate:own",
            "reports:delete:own",
        ],
    },
    RoleDefinition {
        role: Role::Student,
        description: "Enrolled student",
        permissions: &["reports:create", "reports:read:own", "analytics:read:own"],
    },
];
