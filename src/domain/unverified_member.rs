use uuid::Uuid;

use super::{MemberEmail, MemberName};

/// A member who enrolled but has not followed their verification link yet.
#[derive(Debug, Clone)]
pub struct UnverifiedMember {
    pub id: Uuid,
    pub email: MemberEmail,
    pub name: MemberName,
    pub verification_token: String,
}
