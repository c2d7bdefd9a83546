mod member_email;
mod member_name;
mod unverified_member;

pub use member_email::MemberEmail;
pub use member_name::MemberName;
pub use unverified_member::UnverifiedMember;
