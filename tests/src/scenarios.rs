mod cycle;
mod probe;
mod route;
