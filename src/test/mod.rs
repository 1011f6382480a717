mod simulator;
mod support;
