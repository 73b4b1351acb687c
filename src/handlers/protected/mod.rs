// handlers/protected/mod.rs - endpoints that receive `Extension<CurrentUser>`
//
// Every store call passes `user.id` as the owner; rows of other users are
// indistinguishable from missing ones.
pub mod logs;
pub mod medications;
pub mod patterns;
pub mod user;
