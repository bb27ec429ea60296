pub mod ai;
pub mod characters;
pub mod edit;
pub mod listen;
pub mod ls;
pub mod mv;
pub mod new;
pub mod rm;
pub mod show;
pub mod works;
pub mod write;
