mod cache;
mod exec_loop;
