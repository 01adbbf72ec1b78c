pub mod event;
pub mod health;
pub mod intent;
pub mod onesignal;
pub mod outcome;
pub mod realtime;
pub mod request;
pub mod response;
pub mod table;
