pub mod mpc;
