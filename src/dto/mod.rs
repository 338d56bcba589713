pub mod bills;
pub mod cart;
pub mod feedback;
pub mod products;
pub mod surveys;
