mod etc;
