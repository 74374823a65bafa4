pub mod customer;
pub mod review;
pub mod review_token;
