mod helpers;
mod onesignal_tests;
