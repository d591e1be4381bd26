mod decode;
mod fetch;
