pub mod behavioral;
pub mod cdp;
pub mod driver;
pub mod stealth;
