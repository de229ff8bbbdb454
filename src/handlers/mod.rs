pub mod f1data;
