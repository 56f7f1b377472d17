pub mod linear_system;
